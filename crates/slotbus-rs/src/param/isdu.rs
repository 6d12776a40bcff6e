//! IO-Link device-parameter (ISDU) sub-protocol.
//!
//! Same command-window state machine as the plain parameter protocol, but
//! addressed by `{module index, port + 1, index, subindex, length}` and
//! driven by its own command codes. The addressing fields travel
//! little-endian on the wire regardless of payload content; payloads are
//! opaque byte streams interpreted by the linked field device's consumer.

use super::{CommandCode, ProtocolConfig, poll_until_complete};
use crate::hal::{FieldbusError, RegisterTransport};
use crate::types::{C_REG_COMMAND_WINDOW, command_window};
use alloc::vec::Vec;

fn window(offset: u16) -> u16 {
    C_REG_COMMAND_WINDOW + offset
}

/// Writes one little-endian addressing register.
fn write_reg_le<T: RegisterTransport>(
    transport: &mut T,
    address: u16,
    value: u16,
) -> Result<(), FieldbusError> {
    transport
        .write_registers(address, &value.to_le_bytes())
        .map_err(FieldbusError::from)
}

fn read_reg_le<T: RegisterTransport>(
    transport: &mut T,
    address: u16,
) -> Result<u16, FieldbusError> {
    let bytes = transport.read_registers(address, 1)?;
    if bytes.len() < 2 {
        return Err(FieldbusError::BufferTooShort);
    }
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn issue_address<T: RegisterTransport>(
    transport: &mut T,
    module_index: u16,
    port: u8,
    index: u16,
    subindex: u8,
    byte_length: u16,
) -> Result<(), FieldbusError> {
    write_reg_le(transport, window(command_window::MODULE_INDEX), module_index)?;
    write_reg_le(transport, window(command_window::PARAMETER_ID), u16::from(port) + 1)?;
    write_reg_le(transport, window(command_window::INSTANCE), index)?;
    write_reg_le(transport, window(command_window::LENGTH), byte_length)?;
    write_reg_le(transport, window(command_window::SUBINDEX), u16::from(subindex))?;
    Ok(())
}

fn read_code(config: &ProtocolConfig) -> CommandCode {
    if config.swapped_isdu_codes {
        CommandCode::IsduReadSwapped
    } else {
        CommandCode::IsduRead
    }
}

fn write_code(config: &ProtocolConfig) -> CommandCode {
    if config.swapped_isdu_codes {
        CommandCode::IsduWriteSwapped
    } else {
        CommandCode::IsduWrite
    }
}

/// Reads up to `length` bytes of one ISDU object from the device linked to
/// `port` of the IO-Link master at `module_index`.
pub fn read_device_parameter<T: RegisterTransport>(
    transport: &mut T,
    config: &ProtocolConfig,
    module_index: u16,
    port: u8,
    index: u16,
    subindex: u8,
    length: u16,
) -> Result<Vec<u8>, FieldbusError> {
    issue_address(transport, module_index, port, index, subindex, length)?;
    let command = read_code(config) as u16;
    super::write_reg(transport, window(command_window::COMMAND), command)?;
    poll_until_complete(transport, command, config.isdu_poll_limit)?;

    let advertised = read_reg_le(transport, window(command_window::LENGTH))?;
    if advertised == 0 {
        return Ok(Vec::new());
    }
    let mut payload =
        transport.read_registers(window(command_window::PAYLOAD), advertised.div_ceil(2))?;
    payload.truncate(advertised as usize);
    Ok(payload)
}

/// Writes one ISDU object to the device linked to `port`.
pub fn write_device_parameter<T: RegisterTransport>(
    transport: &mut T,
    config: &ProtocolConfig,
    module_index: u16,
    port: u8,
    index: u16,
    subindex: u8,
    data: &[u8],
) -> Result<(), FieldbusError> {
    issue_address(transport, module_index, port, index, subindex, data.len() as u16)?;
    let mut payload = data.to_vec();
    if payload.len() % 2 != 0 {
        payload.push(0);
    }
    transport.write_registers(window(command_window::PAYLOAD), &payload)?;
    let command = write_code(config) as u16;
    super::write_reg(transport, window(command_window::COMMAND), command)?;
    poll_until_complete(transport, command, config.isdu_poll_limit)?;
    Ok(())
}
