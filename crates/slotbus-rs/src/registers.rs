//! Register window allocation for the module chain.
//!
//! Walks the ordered chain once and assigns every module its input, output
//! and diagnosis base addresses from running cursors seeded by the fixed
//! transport constants. Base addresses are assigned exactly once, in chain
//! order, and never overlap between modules.

use crate::module::ModuleRuntime;
use crate::types::{
    C_DIAGNOSIS_REGISTERS, C_REG_DIAGNOSIS_BASE, C_REG_INPUT_BASE, C_REG_OUTPUT_BASE,
    REGISTER_BYTES, RegisterAddress,
};

/// Running allocation cursors, threaded through the chain-build pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAllocator {
    cursor_in: RegisterAddress,
    cursor_out: RegisterAddress,
    cursor_diag: RegisterAddress,
}

impl Default for RegisterAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterAllocator {
    pub fn new() -> Self {
        Self {
            cursor_in: C_REG_INPUT_BASE,
            cursor_out: C_REG_OUTPUT_BASE,
            cursor_diag: C_REG_DIAGNOSIS_BASE,
        }
    }

    /// Assigns the next module's register bases and advances the cursors.
    ///
    /// Input/output bases are assigned iff the module has process data on
    /// that side; the diagnosis base is unconditional (every module consumes
    /// exactly [`C_DIAGNOSIS_REGISTERS`] diagnosis registers, including
    /// modules with zero process data).
    pub fn assign(&mut self, module: &mut ModuleRuntime) {
        let input_span = module.input_register_span();
        if input_span > 0 {
            module.input_register_base = Some(self.cursor_in);
            self.cursor_in += input_span;
        }
        let output_span = module.output_register_span();
        if output_span > 0 {
            module.output_register_base = Some(self.cursor_out);
            self.cursor_out += output_span;
        }
        module.diagnosis_register_base = self.cursor_diag;
        self.cursor_diag += C_DIAGNOSIS_REGISTERS;
    }
}

/// Registers needed to cover `byte_size` bytes of process data.
pub fn register_span(byte_size: usize) -> u16 {
    byte_size.div_ceil(REGISTER_BYTES) as u16
}

/// Runs the allocator over a whole chain, in order.
pub fn allocate(modules: &mut [ModuleRuntime]) {
    let mut allocator = RegisterAllocator::new();
    for module in modules {
        allocator.assign(module);
    }
}
