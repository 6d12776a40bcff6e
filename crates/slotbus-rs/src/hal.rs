use alloc::vec::Vec;
use core::fmt;

/// Defines a portable, descriptive Error type for the coupler core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldbusError {
    /// No variant in any loaded descriptor matches the module code read
    /// from the device. The module cannot be built.
    UnknownVariant(u32),
    /// A channel index is outside the module's layout for that direction.
    ChannelIndexOutOfRange { index: usize, len: usize },
    /// An enumerated parameter was given a label its enum does not define.
    InvalidEnumValue { parameter_id: u16, label: alloc::string::String },
    /// A value's data kind is incompatible with the target channel or parameter.
    TypeMismatch {
        expected: crate::descriptor::DataKind,
        found: crate::descriptor::DataKind,
    },
    /// A frame or payload buffer is too small for the declared bit range.
    BufferTooShort,
    /// The requested module position is beyond the discovered chain.
    ModuleIndexOutOfRange { position: usize, len: usize },
    /// The requested parameter id is not part of the module's parameter map.
    ParameterNotFound { parameter_id: u16 },
    /// The descriptor marks this parameter read-only.
    ParameterReadOnly { parameter_id: u16 },
    /// The module has no process data registers for the requested direction.
    NoProcessData,
    /// A protocol-level failure reported by the command window.
    Protocol(ProtocolError),
    /// An opaque failure from the injected register transport.
    Transport(TransportError),
}

/// Protocol-level failures of the parameter access exchange (§ command window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The device answered with the error execution code.
    Rejected(u16),
    /// The poll ceiling was reached without a terminal execution code.
    Timeout { polls: u32 },
    /// The post-write read-back never matched the written payload.
    VerificationFailed { attempts: u32 },
}

/// Transport-level failures, distinct from protocol execution codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// An underlying I/O error occurred.
    Io,
    /// The transport answered, but not with the expected register count.
    InvalidResponse(&'static str),
}

impl fmt::Display for FieldbusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariant(code) => {
                write!(f, "No descriptor variant matches module code {code:#010x}")
            }
            Self::ChannelIndexOutOfRange { index, len } => {
                write!(f, "Channel index {index} out of range (layout has {len} channels)")
            }
            Self::InvalidEnumValue { parameter_id, label } => {
                write!(f, "Parameter {parameter_id}: unknown enum label '{label}'")
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "Data kind mismatch: expected {expected:?}, found {found:?}")
            }
            Self::BufferTooShort => write!(f, "Buffer is too short for the declared bit range"),
            Self::ModuleIndexOutOfRange { position, len } => {
                write!(f, "Module position {position} out of range (chain has {len} modules)")
            }
            Self::ParameterNotFound { parameter_id } => {
                write!(f, "Parameter {parameter_id} is not defined for this module")
            }
            Self::ParameterReadOnly { parameter_id } => {
                write!(f, "Parameter {parameter_id} is read-only")
            }
            Self::NoProcessData => write!(f, "Module has no process data for this direction"),
            Self::Protocol(e) => write!(f, "Protocol error: {e}"),
            Self::Transport(e) => write!(f, "Transport error: {e}"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(code) => write!(f, "Command rejected with execution code {code}"),
            Self::Timeout { polls } => write!(f, "No terminal execution code after {polls} polls"),
            Self::VerificationFailed { attempts } => {
                write!(f, "Read-back verification failed after {attempts} attempts")
            }
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "An underlying I/O error occurred"),
            Self::InvalidResponse(s) => write!(f, "Invalid transport response: {s}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FieldbusError {}
#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

// --- From Implementations for Error Conversion ---

impl From<ProtocolError> for FieldbusError {
    fn from(e: ProtocolError) -> Self {
        FieldbusError::Protocol(e)
    }
}

impl From<TransportError> for FieldbusError {
    fn from(e: TransportError) -> Self {
        FieldbusError::Transport(e)
    }
}

/// Hardware Abstraction Layer for register-based fieldbus access.
///
/// This trait abstracts the raw register read/write client (e.g. a Modbus TCP
/// connection to the coupler), enabling the chain logic to remain
/// platform-agnostic (no_std). Register contents travel as bytes in wire
/// order: two bytes per 16-bit register, high byte first.
pub trait RegisterTransport {
    /// Reads `count` consecutive registers starting at `address`.
    ///
    /// Returns exactly `count * 2` bytes on success.
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u8>, TransportError>;

    /// Writes the given bytes to consecutive registers starting at `address`.
    ///
    /// `data.len()` must be even; each register takes two bytes, high byte first.
    fn write_registers(&mut self, address: u16, data: &[u8]) -> Result<(), TransportError>;
}
