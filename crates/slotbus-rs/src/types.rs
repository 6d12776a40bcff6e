//! Primitive aliases and the fixed coupler register map.

/// A 16-bit register address within the coupler's address space.
pub type RegisterAddress = u16;

/// Width of one transport register in bytes.
pub const REGISTER_BYTES: usize = 2;

// --- Fixed Register Map ---

/// Register holding the number of modules currently attached to the coupler.
pub const C_REG_MODULE_COUNT: RegisterAddress = 1000;

/// Base of the per-module static info blocks.
///
/// Module `n`'s block starts at `C_REG_MODULE_INFO_BASE + n * C_MODULE_INFO_REGISTERS`.
pub const C_REG_MODULE_INFO_BASE: RegisterAddress = 1100;

/// Size of one static info block in registers.
pub const C_MODULE_INFO_REGISTERS: u16 = 37;

/// Greatest module count the static-info window can address before its
/// blocks would run into the process input area.
pub const C_MAX_MODULES: u16 =
    (C_REG_INPUT_BASE - C_REG_MODULE_INFO_BASE) / C_MODULE_INFO_REGISTERS;

/// Base of the packed process input data area.
pub const C_REG_INPUT_BASE: RegisterAddress = 5000;

/// Base of the packed process output data area.
pub const C_REG_OUTPUT_BASE: RegisterAddress = 8000;

/// Base of the per-module diagnosis blocks.
pub const C_REG_DIAGNOSIS_BASE: RegisterAddress = 11000;

/// Every module consumes exactly this many diagnosis registers,
/// including modules with zero process data.
pub const C_DIAGNOSIS_REGISTERS: u16 = 6;

/// Base of the shared parameter command window.
///
/// The window is shared by the whole chain; callers must serialize access.
pub const C_REG_COMMAND_WINDOW: RegisterAddress = 14000;

/// Command window layout, as offsets from [`C_REG_COMMAND_WINDOW`].
pub mod command_window {
    /// Module index (chain position + 1).
    pub const MODULE_INDEX: u16 = 0;
    /// Parameter id, or ISDU port number + 1.
    pub const PARAMETER_ID: u16 = 1;
    /// Parameter instance, or ISDU index.
    pub const INSTANCE: u16 = 2;
    /// Command on write, execution status on read.
    pub const COMMAND: u16 = 3;
    /// Payload length in registers.
    pub const LENGTH: u16 = 4;
    /// ISDU subindex (unused by the plain parameter protocol).
    pub const SUBINDEX: u16 = 5;
    /// First payload register.
    pub const PAYLOAD: u16 = 10;
}
