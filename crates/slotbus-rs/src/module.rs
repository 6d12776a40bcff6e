//! Per-module runtime state and the static info block.

use crate::channel::{Channel, frame_byte_length};
use crate::descriptor::{ParameterDescriptor, Variant};
use crate::hal::FieldbusError;
use crate::registers::register_span;
use crate::types::RegisterAddress;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Decoded per-module static info block.
///
/// The coupler publishes one 37-register block per module:
///
/// | Registers | Content                          |
/// |-----------|----------------------------------|
/// | 0–1       | module code (high word first)    |
/// | 2         | module class code                |
/// | 3         | communication profile            |
/// | 4         | process input size in bytes      |
/// | 5         | process output size in bytes     |
/// | 6         | input channel count              |
/// | 7         | output channel count             |
/// | 8         | hardware version                 |
/// | 9–10      | firmware version                 |
/// | 11–12     | serial number                    |
/// | 13–20     | product key (ASCII)              |
/// | 21–36     | order text (ASCII)               |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    pub module_code: u32,
    pub class_code: u16,
    pub communication_profile: u16,
    pub input_byte_size: u16,
    pub output_byte_size: u16,
    pub input_channel_count: u16,
    pub output_channel_count: u16,
    pub hardware_version: u16,
    pub firmware_version: u32,
    pub serial_number: u32,
    pub product_key: String,
    pub order_text: String,
}

fn reg(data: &[u8], index: usize) -> u16 {
    u16::from_be_bytes([data[index * 2], data[index * 2 + 1]])
}

fn reg_pair(data: &[u8], index: usize) -> u32 {
    (u32::from(reg(data, index)) << 16) | u32::from(reg(data, index + 1))
}

fn ascii(data: &[u8], first_reg: usize, reg_count: usize) -> String {
    let bytes = &data[first_reg * 2..(first_reg + reg_count) * 2];
    let text = String::from_utf8_lossy(bytes);
    text.trim_end_matches(['\0', ' ']).into()
}

impl ModuleInfo {
    /// Number of registers in one static info block.
    pub const REGISTERS: u16 = crate::types::C_MODULE_INFO_REGISTERS;

    /// Decodes a raw 37-register block.
    pub fn from_registers(data: &[u8]) -> Result<Self, FieldbusError> {
        if data.len() < Self::REGISTERS as usize * 2 {
            return Err(FieldbusError::BufferTooShort);
        }
        Ok(Self {
            module_code: reg_pair(data, 0),
            class_code: reg(data, 2),
            communication_profile: reg(data, 3),
            input_byte_size: reg(data, 4),
            output_byte_size: reg(data, 5),
            input_channel_count: reg(data, 6),
            output_channel_count: reg(data, 7),
            hardware_version: reg(data, 8),
            firmware_version: reg_pair(data, 9),
            serial_number: reg_pair(data, 11),
            product_key: ascii(data, 13, 8),
            order_text: ascii(data, 21, 16),
        })
    }
}

/// One physical module of the chain, bound to its resolved variant,
/// channel layouts, register windows and parameter map.
///
/// Register bases are assigned exactly once by the allocator, in chain
/// order, and never mutated thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRuntime {
    /// 0-based chain index.
    pub position: usize,
    pub variant: Variant,
    pub info: ModuleInfo,
    pub input_register_base: Option<RegisterAddress>,
    pub output_register_base: Option<RegisterAddress>,
    pub diagnosis_register_base: RegisterAddress,
    pub input_channels: Vec<Channel>,
    pub output_channels: Vec<Channel>,
    pub parameter_map: BTreeMap<u16, ParameterDescriptor>,
}

impl ModuleRuntime {
    pub fn new(
        position: usize,
        variant: Variant,
        info: ModuleInfo,
        input_channels: Vec<Channel>,
        output_channels: Vec<Channel>,
        parameters: Vec<ParameterDescriptor>,
    ) -> Self {
        let parameter_map = parameters.into_iter().map(|p| (p.id, p)).collect();
        Self {
            position,
            variant,
            info,
            input_register_base: None,
            output_register_base: None,
            diagnosis_register_base: 0,
            input_channels,
            output_channels,
            parameter_map,
        }
    }

    /// Byte length of the process input frame.
    pub fn input_byte_length(&self) -> usize {
        frame_byte_length(&self.input_channels)
    }

    /// Byte length of the process output frame.
    pub fn output_byte_length(&self) -> usize {
        frame_byte_length(&self.output_channels)
    }

    /// Registers consumed in the input window. Honours the per-variant
    /// override carried by odd-packed hardware.
    pub fn input_register_span(&self) -> u16 {
        if let Some(fixed) = self.variant.input_register_override {
            return fixed;
        }
        register_span(self.input_byte_length())
    }

    /// Registers consumed in the output window.
    pub fn output_register_span(&self) -> u16 {
        register_span(self.output_byte_length())
    }

    pub fn parameter(&self, id: u16) -> Result<&ParameterDescriptor, FieldbusError> {
        self.parameter_map
            .get(&id)
            .ok_or(FieldbusError::ParameterNotFound { parameter_id: id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn decode_static_info_block() {
        let mut data = vec![0u8; 74];
        // module code 0x0003_1FC1
        data[0..4].copy_from_slice(&[0x00, 0x03, 0x1F, 0xC1]);
        data[4..6].copy_from_slice(&[0x00, 0x01]); // class
        data[8..10].copy_from_slice(&[0x00, 0x02]); // input bytes
        data[12..14].copy_from_slice(&[0x00, 0x08]); // input channels
        data[22..26].copy_from_slice(&[0x00, 0x12, 0xD6, 0x87]); // serial 1234567
        data[26..30].copy_from_slice(b"KEY1");
        data[42..48].copy_from_slice(b"DI8-24");

        let info = ModuleInfo::from_registers(&data).unwrap();
        assert_eq!(info.module_code, 0x0003_1FC1);
        assert_eq!(info.class_code, 1);
        assert_eq!(info.input_byte_size, 2);
        assert_eq!(info.input_channel_count, 8);
        assert_eq!(info.serial_number, 1_234_567);
        assert_eq!(info.product_key, "KEY1");
        assert_eq!(info.order_text, "DI8-24");
    }

    #[test]
    fn short_block_fails() {
        assert_eq!(
            ModuleInfo::from_registers(&[0u8; 10]).err().unwrap(),
            FieldbusError::BufferTooShort
        );
    }
}
