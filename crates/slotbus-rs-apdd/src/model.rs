// crates/slotbus-rs-apdd/src/model.rs

//! Serde-mapped shapes of the APDD XML subset this crate reads.
//!
//! These structs mirror the document verbatim; `resolver` turns them into
//! the `slotbus-rs` descriptor model. Attributes that may be written either
//! as decimal or as `0x…` hex stay `String` here and are parsed later.

use alloc::string::String;
use alloc::vec::Vec;
use serde::Deserialize;

// --- Helper Functions for serde(default) ---

/// Helper for `#[serde(default)]` on repeat/count attributes.
pub(super) fn one() -> u16 {
    1
}

/// Helper for the `@access` attribute, absent means writable.
pub(super) fn read_write() -> String {
    String::from("readWrite")
}

// --- Document root ---

/// Represents `<ApddDocument schemaVersion="...">`
#[derive(Debug, Deserialize)]
pub struct ApddDocument {
    #[serde(rename = "@schemaVersion", default)]
    pub schema_version: Option<String>,

    #[serde(rename = "ChannelTypeList", default)]
    pub channel_type_list: Option<ChannelTypeList>,

    #[serde(rename = "ChannelGroupList", default)]
    pub channel_group_list: Option<ChannelGroupList>,

    #[serde(rename = "EnumTypeList", default)]
    pub enum_type_list: Option<EnumTypeList>,

    #[serde(rename = "ParameterList", default)]
    pub parameter_list: Option<ParameterList>,

    #[serde(rename = "ParameterGroupList", default)]
    pub parameter_group_list: Option<ParameterGroupList>,

    #[serde(rename = "VariantList")]
    pub variant_list: Option<VariantList>,
}

// --- Channel types ---

#[derive(Debug, Deserialize, Default)]
pub struct ChannelTypeList {
    #[serde(rename = "ChannelType", default)]
    pub channel_type: Vec<ChannelType>,
}

/// Represents `<ChannelType id="CT_AI" dataType="INT16" direction="IN" .../>`
#[derive(Debug, Deserialize)]
pub struct ChannelType {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@dataType")]
    pub data_type: String,
    /// Declared bit width; absent means the data type's natural width.
    #[serde(rename = "@bitWidth", default)]
    pub bit_width: Option<u16>,
    #[serde(rename = "@count", default = "one")]
    pub count: u16,
    #[serde(rename = "@direction")]
    pub direction: String,
    #[serde(rename = "@byteSwap", default)]
    pub byte_swap: bool,
}

// --- Channel groups ---

#[derive(Debug, Deserialize, Default)]
pub struct ChannelGroupList {
    #[serde(rename = "ChannelGroup", default)]
    pub channel_group: Vec<ChannelGroup>,
}

/// Represents `<ChannelGroup id="...">` with ordered `<Channel>` children.
#[derive(Debug, Deserialize)]
pub struct ChannelGroup {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "Channel", default)]
    pub channel: Vec<ChannelRef>,
    #[serde(rename = "ParameterGroupRef", default)]
    pub parameter_group_ref: Vec<IdRef>,
}

/// Represents `<Channel typeRef="CT_DI" repeat="8"/>`
#[derive(Debug, Deserialize)]
pub struct ChannelRef {
    #[serde(rename = "@typeRef")]
    pub type_ref: String,
    #[serde(rename = "@repeat", default = "one")]
    pub repeat: u16,
}

/// Represents `<ChannelGroupRef id="..."/>` and `<ParameterGroupRef id="..."/>`
#[derive(Debug, Deserialize)]
pub struct IdRef {
    #[serde(rename = "@id")]
    pub id: String,
}

// --- Enumerations ---

#[derive(Debug, Deserialize, Default)]
pub struct EnumTypeList {
    #[serde(rename = "EnumType", default)]
    pub enum_type: Vec<EnumType>,
}

#[derive(Debug, Deserialize)]
pub struct EnumType {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "Item", default)]
    pub item: Vec<EnumItem>,
}

/// Represents `<Item label="off" value="0"/>`
#[derive(Debug, Deserialize)]
pub struct EnumItem {
    #[serde(rename = "@label")]
    pub label: String,
    #[serde(rename = "@value")]
    pub value: i64,
}

// --- Parameters ---

#[derive(Debug, Deserialize, Default)]
pub struct ParameterList {
    #[serde(rename = "Parameter", default)]
    pub parameter: Vec<Parameter>,
}

/// Represents `<Parameter id="2" dataType="UINT8" access="readWrite" .../>`
#[derive(Debug, Deserialize)]
pub struct Parameter {
    /// Decimal or `0x…` hex.
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@instanceMin", default)]
    pub instance_min: u16,
    /// Absent means the parameter has a single instance (`instanceMin`).
    #[serde(rename = "@instanceMax", default)]
    pub instance_max: Option<u16>,
    #[serde(rename = "@access", default = "read_write")]
    pub access: String,
    #[serde(rename = "@count", default = "one")]
    pub count: u16,
    #[serde(rename = "@dataType")]
    pub data_type: String,
    /// `0x…` hex payload.
    #[serde(rename = "@defaultValue", default)]
    pub default_value: Option<String>,
    #[serde(rename = "@enumRef", default)]
    pub enum_ref: Option<String>,
}

// --- Parameter groups ---

#[derive(Debug, Deserialize, Default)]
pub struct ParameterGroupList {
    #[serde(rename = "ParameterGroup", default)]
    pub parameter_group: Vec<ParameterGroup>,
}

#[derive(Debug, Deserialize)]
pub struct ParameterGroup {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "ParameterRef", default)]
    pub parameter_ref: Vec<ParameterRef>,
}

/// Represents `<ParameterRef id="2"/>`
#[derive(Debug, Deserialize)]
pub struct ParameterRef {
    /// Decimal or `0x…` hex.
    #[serde(rename = "@id")]
    pub id: String,
}

// --- Variants ---

#[derive(Debug, Deserialize, Default)]
pub struct VariantList {
    #[serde(rename = "Variant", default)]
    pub variant: Vec<Variant>,
}

/// Represents one `<Variant>` (a concrete hardware SKU).
#[derive(Debug, Deserialize)]
pub struct Variant {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@class")]
    pub class: String,
    /// Decimal or `0x…` hex.
    #[serde(rename = "@moduleCode")]
    pub module_code: String,
    #[serde(rename = "@orderNumber", default)]
    pub order_number: String,
    /// Fixed input register count; overrides the size implied by the
    /// channel layout.
    #[serde(rename = "@inputRegisters", default)]
    pub input_registers: Option<u16>,
    #[serde(rename = "@legacyProtocol", default)]
    pub legacy_protocol: bool,
    #[serde(rename = "ChannelGroupRef", default)]
    pub channel_group_ref: Vec<IdRef>,
    #[serde(rename = "ParameterGroupRef", default)]
    pub parameter_group_ref: Vec<IdRef>,
}
