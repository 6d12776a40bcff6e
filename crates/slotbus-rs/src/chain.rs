//! Coupler runtime: chain discovery and the operation surface.
//!
//! [`Coupler::discover`] interrogates the head station once, builds one
//! [`ModuleRuntime`] per attached module from the loaded descriptors and
//! assigns every register window. The resulting value owns the transport
//! and exposes process data, parameter access, ISDU access and diagnosis
//! per module position.

use crate::channel::Channel;
use crate::codec::{self, ProcessValue};
use crate::descriptor::{DeviceDescriptor, Direction, ParameterDescriptor, Variant, resolve_variant};
use crate::hal::{FieldbusError, RegisterTransport, TransportError};
use crate::module::{ModuleInfo, ModuleRuntime};
use crate::param::{self, ProtocolConfig, isdu};
use crate::registers;
use crate::types::{
    C_DIAGNOSIS_REGISTERS, C_MAX_MODULES, C_MODULE_INFO_REGISTERS, C_REG_MODULE_COUNT,
    C_REG_MODULE_INFO_BASE,
};
use alloc::string::String;
use alloc::vec::Vec;

/// One module's diagnosis window snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisBlock {
    /// Error flags, first diagnosis register.
    pub error_flags: u16,
    /// The whole window, wire order, including the flags register.
    pub raw: Vec<u8>,
}

impl DiagnosisBlock {
    /// Whether any error flag is raised.
    pub fn has_errors(&self) -> bool {
        self.error_flags != 0
    }
}

/// A discovered module chain bound to its register transport.
#[derive(Debug)]
pub struct Coupler<T: RegisterTransport> {
    transport: T,
    config: ProtocolConfig,
    modules: Vec<ModuleRuntime>,
}

impl<T: RegisterTransport> Coupler<T> {
    /// Discovers the attached chain and builds its runtime.
    ///
    /// Reads the module count, then each module's static info block, and
    /// resolves every module code against `descriptors` in order (first
    /// descriptor with a matching variant wins). A module code no
    /// descriptor covers fails the whole discovery; no register windows
    /// are assigned in that case.
    pub fn discover(
        mut transport: T,
        descriptors: &[DeviceDescriptor],
        config: ProtocolConfig,
    ) -> Result<Self, FieldbusError> {
        let count = param::read_reg(&mut transport, C_REG_MODULE_COUNT)?;
        if count > C_MAX_MODULES {
            // A corrupt count would push info block addresses past the
            // static-info window (and past u16 arithmetic).
            return Err(TransportError::InvalidResponse("module count exceeds the info block window").into());
        }
        log::info!("Coupler reports {count} attached modules");

        let mut modules = Vec::with_capacity(count as usize);
        for position in 0..count as usize {
            let base = C_REG_MODULE_INFO_BASE + position as u16 * C_MODULE_INFO_REGISTERS;
            let block = transport.read_registers(base, C_MODULE_INFO_REGISTERS)?;
            let info = ModuleInfo::from_registers(&block)?;
            let (descriptor, variant) = lookup_variant(descriptors, info.module_code)?;
            log::debug!(
                "Position {position}: module code {:#010x} resolved to variant '{}'",
                info.module_code,
                variant.name
            );

            let input_channels = crate::channel::build_channels(descriptor, variant, Direction::In);
            let output_channels =
                crate::channel::build_channels(descriptor, variant, Direction::Out);
            let parameters = collect_parameters(descriptor, variant);
            modules.push(ModuleRuntime::new(
                position,
                variant.clone(),
                info,
                input_channels,
                output_channels,
                parameters,
            ));
        }
        registers::allocate(&mut modules);

        Ok(Self {
            transport,
            config,
            modules,
        })
    }

    pub fn modules(&self) -> &[ModuleRuntime] {
        &self.modules
    }

    pub fn module(&self, position: usize) -> Result<&ModuleRuntime, FieldbusError> {
        self.modules
            .get(position)
            .ok_or(FieldbusError::ModuleIndexOutOfRange {
                position,
                len: self.modules.len(),
            })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // --- Process data ---

    /// Reads and decodes a module's full input frame, one value per input
    /// channel in layout order.
    pub fn read_channels(&mut self, position: usize) -> Result<Vec<ProcessValue>, FieldbusError> {
        let module = self.module(position)?;
        if module.input_channels.is_empty() {
            return Ok(Vec::new());
        }
        let base = module.input_register_base.ok_or(FieldbusError::NoProcessData)?;
        let span = module.input_register_span();
        let channels = module.input_channels.clone();
        let frame = self.transport.read_registers(base, span)?;
        codec::decode_frame(&frame, &channels)
    }

    /// Reads and decodes one input channel.
    pub fn read_channel(
        &mut self,
        position: usize,
        channel: usize,
    ) -> Result<ProcessValue, FieldbusError> {
        let module = self.module(position)?;
        let ch = channel_at(&module.input_channels, channel)?.clone();
        let base = module.input_register_base.ok_or(FieldbusError::NoProcessData)?;
        let span = module.input_register_span();
        let frame = self.transport.read_registers(base, span)?;
        codec::decode_channel(&frame, &ch)
    }

    /// Encodes and writes a module's full output frame in one register write.
    ///
    /// The current frame is read back first so padding bits outside any
    /// declared channel are preserved.
    pub fn write_channels(
        &mut self,
        position: usize,
        values: &[ProcessValue],
    ) -> Result<(), FieldbusError> {
        let module = self.module(position)?;
        let base = module.output_register_base.ok_or(FieldbusError::NoProcessData)?;
        let span = module.output_register_span();
        let channels = module.output_channels.clone();
        let previous = self.transport.read_registers(base, span)?;
        let frame = codec::encode_frame(values, &channels, &previous)?;
        self.transport.write_registers(base, &frame)?;
        Ok(())
    }

    /// Rewrites one output channel, leaving every other bit of the module's
    /// output frame untouched (read-modify-write of the whole frame).
    pub fn write_channel(
        &mut self,
        position: usize,
        channel: usize,
        value: &ProcessValue,
    ) -> Result<(), FieldbusError> {
        let module = self.module(position)?;
        let ch = channel_at(&module.output_channels, channel)?.clone();
        let base = module.output_register_base.ok_or(FieldbusError::NoProcessData)?;
        let span = module.output_register_span();
        let mut frame = self.transport.read_registers(base, span)?;
        codec::encode_channel(&mut frame, &ch, value)?;
        self.transport.write_registers(base, &frame)?;
        Ok(())
    }

    // --- Parameter access ---

    /// Reads one configuration parameter instance.
    pub fn read_parameter(
        &mut self,
        position: usize,
        parameter_id: u16,
        instance: u16,
    ) -> Result<ProcessValue, FieldbusError> {
        let (index, parameter) = self.parameter_target(position, parameter_id)?;
        param::read_parameter(&mut self.transport, &self.config, index, &parameter, instance)
    }

    /// Writes one configuration parameter instance.
    ///
    /// Modules flagged as speaking the legacy protocol take the read-back
    /// verified path; everyone else trusts the execution status.
    pub fn write_parameter(
        &mut self,
        position: usize,
        parameter_id: u16,
        instance: u16,
        value: &ProcessValue,
    ) -> Result<(), FieldbusError> {
        let (index, parameter) = self.parameter_target(position, parameter_id)?;
        if !parameter.writable {
            return Err(FieldbusError::ParameterReadOnly { parameter_id });
        }
        if self.modules[position].variant.legacy_protocol {
            param::write_parameter_verified(
                &mut self.transport,
                &self.config,
                index,
                &parameter,
                instance,
                value,
            )
        } else {
            param::write_parameter(
                &mut self.transport,
                &self.config,
                index,
                &parameter,
                instance,
                value,
            )
        }
    }

    /// Writes an enumerated parameter by its descriptor label.
    pub fn write_parameter_label(
        &mut self,
        position: usize,
        parameter_id: u16,
        instance: u16,
        label: &str,
    ) -> Result<(), FieldbusError> {
        let (_, parameter) = self.parameter_target(position, parameter_id)?;
        let value = param::resolve_enum_label(&parameter, label)?;
        self.write_parameter(position, parameter_id, instance, &value)
    }

    // --- ISDU access ---

    /// Reads an ISDU object from the device on `port` of the IO-Link
    /// master at `position`.
    pub fn read_device_parameter(
        &mut self,
        position: usize,
        port: u8,
        index: u16,
        subindex: u8,
        length: u16,
    ) -> Result<Vec<u8>, FieldbusError> {
        let module_index = self.module_index(position)?;
        isdu::read_device_parameter(
            &mut self.transport,
            &self.config,
            module_index,
            port,
            index,
            subindex,
            length,
        )
    }

    /// Writes an ISDU object to the device on `port` of the IO-Link
    /// master at `position`.
    pub fn write_device_parameter(
        &mut self,
        position: usize,
        port: u8,
        index: u16,
        subindex: u8,
        data: &[u8],
    ) -> Result<(), FieldbusError> {
        let module_index = self.module_index(position)?;
        isdu::write_device_parameter(
            &mut self.transport,
            &self.config,
            module_index,
            port,
            index,
            subindex,
            data,
        )
    }

    // --- Diagnosis ---

    /// Reads a module's diagnosis window.
    pub fn read_diagnosis(&mut self, position: usize) -> Result<DiagnosisBlock, FieldbusError> {
        let base = self.module(position)?.diagnosis_register_base;
        let raw = self
            .transport
            .read_registers(base, C_DIAGNOSIS_REGISTERS)?;
        if raw.len() < 2 {
            return Err(FieldbusError::BufferTooShort);
        }
        let error_flags = u16::from_be_bytes([raw[0], raw[1]]);
        if error_flags != 0 {
            log::warn!(
                "Module {position} raises diagnosis flags {error_flags:#06x}"
            );
        }
        Ok(DiagnosisBlock { error_flags, raw })
    }

    // --- Internal ---

    /// Command-window module index of a chain position (position + 1).
    fn module_index(&self, position: usize) -> Result<u16, FieldbusError> {
        self.module(position)?;
        Ok(position as u16 + 1)
    }

    fn parameter_target(
        &self,
        position: usize,
        parameter_id: u16,
    ) -> Result<(u16, ParameterDescriptor), FieldbusError> {
        let module = self.module(position)?;
        let parameter = module.parameter(parameter_id)?.clone();
        Ok((position as u16 + 1, parameter))
    }
}

fn channel_at(channels: &[Channel], index: usize) -> Result<&Channel, FieldbusError> {
    channels.get(index).ok_or(FieldbusError::ChannelIndexOutOfRange {
        index,
        len: channels.len(),
    })
}

/// Finds the first descriptor defining a variant for `module_code`.
fn lookup_variant(
    descriptors: &[DeviceDescriptor],
    module_code: u32,
) -> Result<(&DeviceDescriptor, &Variant), FieldbusError> {
    for descriptor in descriptors {
        if let Ok(variant) = resolve_variant(descriptor, module_code) {
            return Ok((descriptor, variant));
        }
    }
    Err(FieldbusError::UnknownVariant(module_code))
}

/// Collects the parameter definitions a variant is governed by: the groups
/// it names directly plus the groups named by its channel groups. Duplicate
/// ids collapse; unknown references are logged and skipped.
fn collect_parameters(descriptor: &DeviceDescriptor, variant: &Variant) -> Vec<ParameterDescriptor> {
    let mut group_ids: Vec<&str> = variant
        .parameter_group_ids
        .iter()
        .map(String::as_str)
        .collect();
    for channel_group_id in &variant.channel_group_ids {
        if let Some(group) = descriptor.channel_group(channel_group_id) {
            group_ids.extend(group.parameter_group_ids.iter().map(String::as_str));
        }
    }

    let mut parameters: Vec<ParameterDescriptor> = Vec::new();
    for group_id in group_ids {
        let Some(group) = descriptor.parameter_group(group_id) else {
            log::warn!(
                "Variant '{}' references unknown parameter group '{}'",
                variant.name,
                group_id
            );
            continue;
        };
        for &parameter_id in &group.parameter_ids {
            if parameters.iter().any(|p| p.id == parameter_id) {
                continue;
            }
            match descriptor.parameter(parameter_id) {
                Some(p) => parameters.push(p.clone()),
                None => log::warn!(
                    "Parameter group '{}' references undefined parameter {}",
                    group.id,
                    parameter_id
                ),
            }
        }
    }
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        ChannelGroup, ChannelGroupEntry, ChannelTemplate, DataKind, ParameterGroup,
    };
    use crate::param::status;
    use crate::test_transport::MockTransport;
    use crate::types::{
        C_REG_COMMAND_WINDOW, C_REG_DIAGNOSIS_BASE, C_REG_INPUT_BASE, C_REG_OUTPUT_BASE,
        command_window,
    };
    use alloc::string::ToString;
    use alloc::vec;

    const CODE_DI4: u32 = 0x0013_1001;
    const CODE_AO2: u32 = 0x0045_2002;

    fn fixture_descriptor(legacy: bool) -> DeviceDescriptor {
        DeviceDescriptor {
            channel_types: vec![
                ChannelTemplate {
                    id: "CT_DI".to_string(),
                    data_kind: DataKind::Bool,
                    bit_width: 1,
                    array_length: 1,
                    direction: Direction::In,
                    byte_swap: false,
                },
                ChannelTemplate {
                    id: "CT_AO".to_string(),
                    data_kind: DataKind::Int16,
                    bit_width: 16,
                    array_length: 1,
                    direction: Direction::Out,
                    byte_swap: false,
                },
            ],
            channel_groups: vec![
                ChannelGroup {
                    id: "CG_DI4".to_string(),
                    entries: vec![ChannelGroupEntry {
                        channel_type_id: "CT_DI".to_string(),
                        repeat_count: 4,
                    }],
                    parameter_group_ids: vec!["PG_DI".to_string()],
                },
                ChannelGroup {
                    id: "CG_AO2".to_string(),
                    entries: vec![ChannelGroupEntry {
                        channel_type_id: "CT_AO".to_string(),
                        repeat_count: 2,
                    }],
                    parameter_group_ids: vec![],
                },
            ],
            parameters: vec![
                ParameterDescriptor {
                    id: 2,
                    instance_range: (0, 3),
                    writable: true,
                    array_size: 1,
                    data_kind: DataKind::UInt8,
                    default_value: None,
                    enum_type: None,
                },
                ParameterDescriptor {
                    id: 9,
                    instance_range: (0, 0),
                    writable: false,
                    array_size: 1,
                    data_kind: DataKind::UInt16,
                    default_value: None,
                    enum_type: None,
                },
            ],
            parameter_groups: vec![ParameterGroup {
                id: "PG_DI".to_string(),
                parameter_ids: vec![2, 9],
            }],
            enum_types: vec![],
            variants: vec![
                Variant {
                    name: "DI4".to_string(),
                    class: "DI".to_string(),
                    module_code: CODE_DI4,
                    order_number: "100".to_string(),
                    channel_group_ids: vec!["CG_DI4".to_string()],
                    parameter_group_ids: vec![],
                    input_register_override: None,
                    legacy_protocol: legacy,
                },
                Variant {
                    name: "AO2".to_string(),
                    class: "AO".to_string(),
                    module_code: CODE_AO2,
                    order_number: "200".to_string(),
                    channel_group_ids: vec!["CG_AO2".to_string()],
                    parameter_group_ids: vec![],
                    input_register_override: None,
                    legacy_protocol: false,
                },
            ],
        }
    }

    fn install_module(t: &mut MockTransport, position: u16, module_code: u32) {
        let base = C_REG_MODULE_INFO_BASE + position * C_MODULE_INFO_REGISTERS;
        t.set_register(base, (module_code >> 16) as u16);
        t.set_register(base + 1, module_code as u16);
    }

    fn two_module_coupler(legacy: bool) -> Coupler<MockTransport> {
        let mut t = MockTransport::new();
        t.set_register(C_REG_MODULE_COUNT, 2);
        install_module(&mut t, 0, CODE_DI4);
        install_module(&mut t, 1, CODE_AO2);
        Coupler::discover(t, &[fixture_descriptor(legacy)], ProtocolConfig::default()).unwrap()
    }

    #[test]
    fn discovery_builds_layouts_and_register_windows() {
        let coupler = two_module_coupler(false);
        let modules = coupler.modules();
        assert_eq!(modules.len(), 2);

        assert_eq!(modules[0].variant.name, "DI4");
        assert_eq!(modules[0].input_channels.len(), 4);
        assert_eq!(modules[0].input_register_base, Some(C_REG_INPUT_BASE));
        assert_eq!(modules[0].output_register_base, None);
        // Parameters are pulled in through the channel group's group ids.
        assert!(modules[0].parameter_map.contains_key(&2));
        assert!(modules[0].parameter_map.contains_key(&9));

        assert_eq!(modules[1].variant.name, "AO2");
        assert_eq!(modules[1].output_channels.len(), 2);
        assert_eq!(modules[1].input_register_base, None);
        assert_eq!(modules[1].output_register_base, Some(C_REG_OUTPUT_BASE));
        assert_eq!(modules[1].diagnosis_register_base, C_REG_DIAGNOSIS_BASE + 6);
    }

    #[test]
    fn implausible_module_count_fails_discovery() {
        let mut t = MockTransport::new();
        // A corrupt count that would overflow the info block addressing.
        t.set_register(C_REG_MODULE_COUNT, 2000);
        install_module(&mut t, 0, CODE_DI4);
        let err = Coupler::discover(t, &[fixture_descriptor(false)], ProtocolConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            FieldbusError::Transport(TransportError::InvalidResponse(
                "module count exceeds the info block window"
            ))
        );
    }

    #[test]
    fn unknown_module_code_fails_discovery() {
        let mut t = MockTransport::new();
        t.set_register(C_REG_MODULE_COUNT, 2);
        install_module(&mut t, 0, CODE_DI4);
        install_module(&mut t, 1, 0xDEAD_BEEF);
        let err = Coupler::discover(t, &[fixture_descriptor(false)], ProtocolConfig::default())
            .unwrap_err();
        assert_eq!(err, FieldbusError::UnknownVariant(0xDEAD_BEEF));
    }

    #[test]
    fn read_channels_decodes_the_input_frame() {
        let mut coupler = two_module_coupler(false);
        // Bits 0, 1 and 3 of the frame's first byte.
        coupler
            .transport_mut()
            .set_register_bytes(C_REG_INPUT_BASE, &[0x0B, 0x00]);
        let values = coupler.read_channels(0).unwrap();
        assert_eq!(
            values,
            vec![
                ProcessValue::Bool(true),
                ProcessValue::Bool(true),
                ProcessValue::Bool(false),
                ProcessValue::Bool(true),
            ]
        );
        assert_eq!(
            coupler.read_channel(0, 2).unwrap(),
            ProcessValue::Bool(false)
        );
    }

    #[test]
    fn single_channel_write_leaves_siblings_untouched() {
        let mut coupler = two_module_coupler(false);
        coupler
            .transport_mut()
            .set_register_bytes(C_REG_OUTPUT_BASE, &[0x12, 0x34, 0x00, 0x00]);
        coupler
            .write_channel(1, 1, &ProcessValue::Int16(-2))
            .unwrap();
        let t = coupler.transport();
        assert_eq!(t.register(C_REG_OUTPUT_BASE), 0x1234);
        assert_eq!(t.register(C_REG_OUTPUT_BASE + 1), 0xFFFE);
        // One bulk frame write, no per-register writes.
        assert_eq!(t.writes.len(), 1);
        assert_eq!(t.writes[0].0, C_REG_OUTPUT_BASE);
        assert_eq!(t.writes[0].1.len(), 4);
    }

    #[test]
    fn write_channels_writes_the_whole_frame_once() {
        let mut coupler = two_module_coupler(false);
        coupler
            .write_channels(1, &[ProcessValue::Int16(100), ProcessValue::Int16(-100)])
            .unwrap();
        let t = coupler.transport();
        assert_eq!(t.writes.len(), 1);
        assert_eq!(t.register(C_REG_OUTPUT_BASE), 100);
        assert_eq!(t.register(C_REG_OUTPUT_BASE + 1), (-100i16) as u16);
    }

    #[test]
    fn input_only_module_rejects_output_access() {
        let mut coupler = two_module_coupler(false);
        let err = coupler
            .write_channel(0, 0, &ProcessValue::Bool(true))
            .unwrap_err();
        assert_eq!(err, FieldbusError::NoProcessData);
    }

    #[test]
    fn channel_index_out_of_range() {
        let mut coupler = two_module_coupler(false);
        let err = coupler.read_channel(0, 4).unwrap_err();
        assert_eq!(err, FieldbusError::ChannelIndexOutOfRange { index: 4, len: 4 });
    }

    #[test]
    fn parameter_write_targets_position_plus_one() {
        let mut coupler = two_module_coupler(false);
        coupler.transport_mut().script_status(&[status::COMPLETE]);
        coupler
            .write_parameter(0, 2, 1, &ProcessValue::UInt8(3))
            .unwrap();
        let t = coupler.transport();
        assert_eq!(
            t.register(C_REG_COMMAND_WINDOW + command_window::MODULE_INDEX),
            1
        );
        // Non-legacy module: no read-back occurred.
        assert_eq!(t.payload_reads, 0);
    }

    #[test]
    fn legacy_module_writes_take_the_verified_path() {
        let mut coupler = two_module_coupler(true);
        {
            let t = coupler.transport_mut();
            t.script_status(&[status::COMPLETE, status::COMPLETE]);
            t.set_register(C_REG_COMMAND_WINDOW + command_window::LENGTH, 1);
            // Read-back matches on the first attempt.
            t.script_payload(&[0x0003]);
        }
        coupler
            .write_parameter(0, 2, 0, &ProcessValue::UInt8(3))
            .unwrap();
        assert_eq!(coupler.transport().payload_reads, 1);
    }

    #[test]
    fn read_only_parameter_is_rejected_without_transport_traffic() {
        let mut coupler = two_module_coupler(false);
        let before = coupler.transport().writes.len();
        let err = coupler
            .write_parameter(0, 9, 0, &ProcessValue::UInt16(1))
            .unwrap_err();
        assert_eq!(err, FieldbusError::ParameterReadOnly { parameter_id: 9 });
        assert_eq!(coupler.transport().writes.len(), before);
    }

    #[test]
    fn unknown_parameter_id() {
        let mut coupler = two_module_coupler(false);
        let err = coupler.read_parameter(0, 77, 0).unwrap_err();
        assert_eq!(err, FieldbusError::ParameterNotFound { parameter_id: 77 });
    }

    #[test]
    fn diagnosis_window_snapshot() {
        let mut coupler = two_module_coupler(false);
        coupler
            .transport_mut()
            .set_register_bytes(C_REG_DIAGNOSIS_BASE + 6, &[0x00, 0x05, 0xAB, 0xCD]);
        let diagnosis = coupler.read_diagnosis(1).unwrap();
        assert_eq!(diagnosis.error_flags, 0x0005);
        assert!(diagnosis.has_errors());
        assert_eq!(diagnosis.raw.len(), 12);
        assert_eq!(&diagnosis.raw[2..4], &[0xAB, 0xCD]);
    }

    #[test]
    fn module_position_out_of_range() {
        let mut coupler = two_module_coupler(false);
        let err = coupler.read_channels(5).unwrap_err();
        assert_eq!(
            err,
            FieldbusError::ModuleIndexOutOfRange { position: 5, len: 2 }
        );
    }
}
