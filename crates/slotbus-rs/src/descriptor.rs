//! Typed in-memory representation of a device descriptor (APDD).
//!
//! A descriptor is the vendor-supplied catalogue a physical module is built
//! from: channel type templates, channel groupings, parameter definitions,
//! enumerations and the hardware variants that tie them together. The
//! `slotbus-rs-apdd` crate produces these values from APDD XML documents;
//! they can also be constructed directly (e.g. in tests).

use crate::hal::FieldbusError;
use alloc::string::String;
use alloc::vec::Vec;

/// Interpretation of a channel's or parameter's raw bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    /// Opaque byte sequence, consumer-interpreted (e.g. IO-Link payloads).
    Bytes,
}

impl DataKind {
    /// Natural bit width of one element of this kind.
    pub fn bit_width(self) -> u16 {
        match self {
            DataKind::Bool => 1,
            DataKind::Int8 | DataKind::UInt8 | DataKind::Bytes => 8,
            DataKind::Int16 | DataKind::UInt16 => 16,
        }
    }
}

/// Direction of a channel relative to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Process input (read by the controller).
    In,
    /// Process output (written by the controller).
    Out,
    /// Both views; the read side and write side share the same physical bits.
    InOut,
}

impl Direction {
    /// Whether a channel of direction `self` appears in the `view` layout.
    pub fn applies_to(self, view: Direction) -> bool {
        self == view || self == Direction::InOut
    }
}

/// One channel type template from the descriptor catalogue.
///
/// Bit offsets are intentionally absent: they are computed by the layout
/// builder from declaration order, never authored.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTemplate {
    pub id: String,
    pub data_kind: DataKind,
    pub bit_width: u16,
    /// Number of elements; `1` for scalars.
    pub array_length: u16,
    pub direction: Direction,
    /// Reverse byte order of each multi-byte element before interpretation.
    pub byte_swap: bool,
}

/// One `(channel type, repeat count)` reference within a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroupEntry {
    pub channel_type_id: String,
    pub repeat_count: u16,
}

/// An ordered set of channel type references, plus the parameter groups
/// that govern it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    pub id: String,
    pub entries: Vec<ChannelGroupEntry>,
    pub parameter_group_ids: Vec<String>,
}

/// A named set of parameter ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    pub id: String,
    pub parameter_ids: Vec<u16>,
}

/// A label ↔ numeric value mapping for enumerated parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub id: String,
    pub items: Vec<(String, i64)>,
}

impl EnumType {
    /// Resolves a label to its numeric value.
    pub fn value_of(&self, label: &str) -> Option<i64> {
        self.items
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, v)| v)
    }
}

/// One configuration parameter definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub id: u16,
    /// Valid instance numbers, inclusive (e.g. one instance per channel).
    pub instance_range: (u16, u16),
    pub writable: bool,
    /// Number of elements; `1` for scalars.
    pub array_size: u16,
    /// Underlying numeric kind, also for enumerated parameters.
    pub data_kind: DataKind,
    pub default_value: Option<Vec<u8>>,
    /// Present iff the parameter is enumerated.
    pub enum_type: Option<EnumType>,
}

/// One concrete hardware SKU selected from a descriptor by module code.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    /// Module class / category code (e.g. digital input, IO-Link master).
    pub class: String,
    /// Numeric module code read from the device at discovery time.
    pub module_code: u32,
    pub order_number: String,
    pub channel_group_ids: Vec<String>,
    pub parameter_group_ids: Vec<String>,
    /// Fixed input register count, overriding the size implied by the
    /// channel byte size. Set for the odd-packed 8-input digital variant.
    pub input_register_override: Option<u16>,
    /// Module speaks the legacy parameter protocol; writes must be
    /// read-back verified.
    pub legacy_protocol: bool,
}

/// A fully loaded device descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDescriptor {
    pub channel_types: Vec<ChannelTemplate>,
    pub channel_groups: Vec<ChannelGroup>,
    pub parameters: Vec<ParameterDescriptor>,
    pub parameter_groups: Vec<ParameterGroup>,
    pub enum_types: Vec<EnumType>,
    pub variants: Vec<Variant>,
}

impl DeviceDescriptor {
    pub fn channel_type(&self, id: &str) -> Option<&ChannelTemplate> {
        self.channel_types.iter().find(|t| t.id == id)
    }

    pub fn channel_group(&self, id: &str) -> Option<&ChannelGroup> {
        self.channel_groups.iter().find(|g| g.id == id)
    }

    pub fn parameter(&self, id: u16) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.id == id)
    }

    pub fn parameter_group(&self, id: &str) -> Option<&ParameterGroup> {
        self.parameter_groups.iter().find(|g| g.id == id)
    }
}

/// Selects the one variant matching a raw module code.
///
/// Descriptors with duplicate module codes are a descriptor-authoring defect;
/// the first match wins and the ambiguity is logged rather than raised, to
/// stay tolerant of vendor data quality.
pub fn resolve_variant(
    descriptor: &DeviceDescriptor,
    module_code: u32,
) -> Result<&Variant, FieldbusError> {
    let mut matches = descriptor
        .variants
        .iter()
        .filter(|v| v.module_code == module_code);

    let first = matches
        .next()
        .ok_or(FieldbusError::UnknownVariant(module_code))?;

    if matches.next().is_some() {
        log::warn!(
            "Descriptor defines module code {:#010x} more than once; using variant '{}'",
            module_code,
            first.name
        );
    }
    Ok(first)
}
