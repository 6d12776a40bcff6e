//! Parameter access protocol engine.
//!
//! Read and write named configuration parameters through the coupler's
//! shared command window: compose a command frame, issue the command code,
//! then poll the execution status register until a terminal code appears.
//! The window is a single shared register range per chain; callers must
//! serialize access (see the crate-level concurrency notes).

pub mod isdu;

use crate::descriptor::{DataKind, ParameterDescriptor};
use crate::hal::{FieldbusError, ProtocolError, RegisterTransport};
use crate::types::{C_REG_COMMAND_WINDOW, command_window};
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

/// Command codes written to the command/status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CommandCode {
    Read = 1,
    Write = 2,
    /// IO-Link device parameter read.
    IsduRead = 100,
    /// IO-Link device parameter write.
    IsduWrite = 101,
    /// Secondary swapped-byte-order ISDU encoding, not exercised by default.
    IsduReadSwapped = 50,
    IsduWriteSwapped = 51,
}

/// Execution status codes read back from the command/status register.
pub mod status {
    pub const READ: u16 = 1;
    pub const WRITE: u16 = 2;
    pub const BUSY: u16 = 3;
    pub const ERROR: u16 = 4;
    /// Any status at or above this value signals completion.
    pub const COMPLETE: u16 = 16;
}

/// Protocol tunables.
///
/// The poll ceilings and the ISDU command-code numbering diverge between
/// observed firmware generations; both are configuration, not constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Poll ceiling for plain parameter commands.
    pub poll_limit: u32,
    /// Poll ceiling for ISDU commands (observed to need a higher bound).
    pub isdu_poll_limit: u32,
    /// Read-back attempts of the legacy verified write path.
    pub verify_retries: u32,
    /// Use the secondary 50/51 ISDU command codes instead of 100/101.
    pub swapped_isdu_codes: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            poll_limit: 1_000,
            isdu_poll_limit: 5_000,
            verify_retries: 10,
            swapped_isdu_codes: false,
        }
    }
}

// --- Register helpers ---

fn window(offset: u16) -> u16 {
    C_REG_COMMAND_WINDOW + offset
}

pub(crate) fn write_reg<T: RegisterTransport>(
    transport: &mut T,
    address: u16,
    value: u16,
) -> Result<(), FieldbusError> {
    transport
        .write_registers(address, &value.to_be_bytes())
        .map_err(FieldbusError::from)
}

pub(crate) fn read_reg<T: RegisterTransport>(
    transport: &mut T,
    address: u16,
) -> Result<u16, FieldbusError> {
    let bytes = transport.read_registers(address, 1)?;
    if bytes.len() < 2 {
        return Err(FieldbusError::BufferTooShort);
    }
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Polls the status register until a terminal execution code appears,
/// bounded by `limit` iterations.
///
/// The device echoes the issued command code until it answers, and issued
/// ISDU codes are themselves ≥ 16; completion is therefore a status at or
/// above [`status::COMPLETE`] that differs from the issued code.
pub(crate) fn poll_until_complete<T: RegisterTransport>(
    transport: &mut T,
    issued: u16,
    limit: u32,
) -> Result<u16, FieldbusError> {
    for _ in 0..limit {
        let current = read_reg(transport, window(command_window::COMMAND))?;
        // Stale read/write echoes from an earlier exchange are pending too.
        if current == issued
            || current == status::BUSY
            || current == status::READ
            || current == status::WRITE
        {
            continue;
        }
        if current == status::ERROR {
            return Err(ProtocolError::Rejected(current).into());
        }
        if current >= status::COMPLETE {
            return Ok(current);
        }
    }
    Err(ProtocolError::Timeout { polls: limit }.into())
}

// --- Value packing ---

/// Packs a typed value into command-window payload bytes (whole registers,
/// high byte first per register; sub-register scalars occupy the low byte).
pub fn pack_value(
    kind: DataKind,
    array_size: u16,
    value: &crate::codec::ProcessValue,
) -> Result<Vec<u8>, FieldbusError> {
    use crate::codec::ProcessValue;

    if value.data_kind() != kind {
        return Err(FieldbusError::TypeMismatch {
            expected: kind,
            found: value.data_kind(),
        });
    }
    let n = array_size.max(1) as usize;
    let mut raw = match value {
        ProcessValue::Bool(b) => vec![0, u8::from(*b)],
        ProcessValue::Int8(v) => vec![0, *v as u8],
        ProcessValue::UInt8(v) => vec![0, *v],
        ProcessValue::Int16(v) => v.to_be_bytes().to_vec(),
        ProcessValue::UInt16(v) => v.to_be_bytes().to_vec(),
        ProcessValue::Bytes(bytes) => {
            if bytes.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            bytes.clone()
        }
        ProcessValue::BoolArray(bits) => {
            if bits.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            let mut out = vec![0u8; n.div_ceil(8)];
            for (i, &b) in bits.iter().enumerate() {
                if b {
                    out[i / 8] |= 1 << (i % 8);
                }
            }
            out
        }
        ProcessValue::Int8Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.iter().map(|&x| x as u8).collect()
        }
        ProcessValue::UInt8Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.clone()
        }
        ProcessValue::Int16Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.iter().flat_map(|x| x.to_be_bytes()).collect()
        }
        ProcessValue::UInt16Array(v) => {
            if v.len() != n {
                return Err(FieldbusError::BufferTooShort);
            }
            v.iter().flat_map(|x| x.to_be_bytes()).collect()
        }
    };
    if raw.len() % 2 != 0 {
        raw.push(0);
    }
    Ok(raw)
}

/// Inverse of [`pack_value`].
pub fn unpack_value(
    kind: DataKind,
    array_size: u16,
    raw: &[u8],
) -> Result<crate::codec::ProcessValue, FieldbusError> {
    use crate::codec::ProcessValue;

    let n = array_size.max(1) as usize;
    let need = match kind {
        DataKind::Bool if n == 1 => 2,
        DataKind::Bool => n.div_ceil(8),
        DataKind::Int8 | DataKind::UInt8 if n == 1 => 2,
        DataKind::Int8 | DataKind::UInt8 => n,
        DataKind::Int16 | DataKind::UInt16 => n * 2,
        DataKind::Bytes => n,
    };
    if raw.len() < need {
        return Err(FieldbusError::BufferTooShort);
    }
    Ok(match (kind, n) {
        (DataKind::Bool, 1) => ProcessValue::Bool(raw[1] != 0),
        (DataKind::Bool, _) => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(raw[i / 8] & (1 << (i % 8)) != 0);
            }
            ProcessValue::BoolArray(v)
        }
        (DataKind::Int8, 1) => ProcessValue::Int8(raw[1] as i8),
        (DataKind::Int8, _) => ProcessValue::Int8Array(raw[..n].iter().map(|&b| b as i8).collect()),
        (DataKind::UInt8, 1) => ProcessValue::UInt8(raw[1]),
        (DataKind::UInt8, _) => ProcessValue::UInt8Array(raw[..n].to_vec()),
        (DataKind::Int16, 1) => ProcessValue::Int16(i16::from_be_bytes([raw[0], raw[1]])),
        (DataKind::Int16, _) => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(i16::from_be_bytes([raw[i * 2], raw[i * 2 + 1]]));
            }
            ProcessValue::Int16Array(v)
        }
        (DataKind::UInt16, 1) => ProcessValue::UInt16(u16::from_be_bytes([raw[0], raw[1]])),
        (DataKind::UInt16, _) => {
            let mut v = Vec::with_capacity(n);
            for i in 0..n {
                v.push(u16::from_be_bytes([raw[i * 2], raw[i * 2 + 1]]));
            }
            ProcessValue::UInt16Array(v)
        }
        (DataKind::Bytes, _) => ProcessValue::Bytes(raw[..n].to_vec()),
    })
}

/// Resolves an enum label to a typed value for an enumerated parameter.
pub fn resolve_enum_label(
    parameter: &ParameterDescriptor,
    label: &str,
) -> Result<crate::codec::ProcessValue, FieldbusError> {
    use crate::codec::ProcessValue;

    let unknown = || FieldbusError::InvalidEnumValue {
        parameter_id: parameter.id,
        label: label.to_string(),
    };
    let numeric = parameter
        .enum_type
        .as_ref()
        .and_then(|e| e.value_of(label))
        .ok_or_else(unknown)?;
    Ok(match parameter.data_kind {
        DataKind::Bool => ProcessValue::Bool(numeric != 0),
        DataKind::Int8 => ProcessValue::Int8(i8::try_from(numeric).map_err(|_| unknown())?),
        DataKind::UInt8 => ProcessValue::UInt8(u8::try_from(numeric).map_err(|_| unknown())?),
        DataKind::Int16 => ProcessValue::Int16(i16::try_from(numeric).map_err(|_| unknown())?),
        DataKind::UInt16 => ProcessValue::UInt16(u16::try_from(numeric).map_err(|_| unknown())?),
        DataKind::Bytes => return Err(unknown()),
    })
}

// --- Command exchange ---

fn issue_header<T: RegisterTransport>(
    transport: &mut T,
    module_index: u16,
    parameter_id: u16,
    instance: u16,
) -> Result<(), FieldbusError> {
    let mut header = Vec::with_capacity(6);
    header.extend_from_slice(&module_index.to_be_bytes());
    header.extend_from_slice(&parameter_id.to_be_bytes());
    header.extend_from_slice(&instance.to_be_bytes());
    transport
        .write_registers(window(command_window::MODULE_INDEX), &header)
        .map_err(FieldbusError::from)
}

/// Writes one parameter value through the command window.
///
/// `module_index` is the chain position + 1.
pub fn write_parameter<T: RegisterTransport>(
    transport: &mut T,
    config: &ProtocolConfig,
    module_index: u16,
    parameter: &ParameterDescriptor,
    instance: u16,
    value: &crate::codec::ProcessValue,
) -> Result<(), FieldbusError> {
    let payload = pack_value(parameter.data_kind, parameter.array_size, value)?;
    issue_header(transport, module_index, parameter.id, instance)?;
    transport.write_registers(window(command_window::PAYLOAD), &payload)?;
    write_reg(transport, window(command_window::LENGTH), (payload.len() / 2) as u16)?;
    write_reg(transport, window(command_window::COMMAND), CommandCode::Write as u16)?;
    poll_until_complete(transport, CommandCode::Write as u16, config.poll_limit)?;
    Ok(())
}

/// Reads one parameter value through the command window.
pub fn read_parameter<T: RegisterTransport>(
    transport: &mut T,
    config: &ProtocolConfig,
    module_index: u16,
    parameter: &ParameterDescriptor,
    instance: u16,
) -> Result<crate::codec::ProcessValue, FieldbusError> {
    issue_header(transport, module_index, parameter.id, instance)?;
    write_reg(transport, window(command_window::COMMAND), CommandCode::Read as u16)?;
    poll_until_complete(transport, CommandCode::Read as u16, config.poll_limit)?;

    let length = read_reg(transport, window(command_window::LENGTH))?;
    let payload = if length == 0 {
        Vec::new()
    } else {
        transport.read_registers(window(command_window::PAYLOAD), length)?
    };
    unpack_value(parameter.data_kind, parameter.array_size, &payload)
}

/// Legacy write path: issue, poll, then read back and compare, retrying the
/// whole sequence a bounded number of times. Exhausting the retries is
/// [`ProtocolError::VerificationFailed`].
pub fn write_parameter_verified<T: RegisterTransport>(
    transport: &mut T,
    config: &ProtocolConfig,
    module_index: u16,
    parameter: &ParameterDescriptor,
    instance: u16,
    value: &crate::codec::ProcessValue,
) -> Result<(), FieldbusError> {
    let attempts = config.verify_retries.max(1);
    for attempt in 1..=attempts {
        write_parameter(transport, config, module_index, parameter, instance, value)?;
        let read_back = read_parameter(transport, config, module_index, parameter, instance)?;
        if read_back == *value {
            return Ok(());
        }
        log::warn!(
            "Module {module_index} parameter {} instance {instance}: read-back mismatch (attempt {attempt}/{attempts})",
            parameter.id
        );
    }
    Err(ProtocolError::VerificationFailed { attempts }.into())
}
