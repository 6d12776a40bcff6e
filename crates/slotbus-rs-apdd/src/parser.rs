// crates/slotbus-rs-apdd/src/parser.rs

use crate::error::ApddError;
use crate::model;
use crate::resolver;
use alloc::vec::Vec;
use core::num::ParseIntError;
use slotbus_rs::descriptor::DeviceDescriptor;

/// Parses an APDD XML string slice into a resolved [`DeviceDescriptor`].
///
/// Only the schema subset driving process-data layouts and parameter access
/// is read; unknown elements and attributes are ignored.
///
/// # Errors
/// Returns an `ApddError` if deserialization fails, a numeric or hex
/// attribute is malformed, or an id reference points at nothing.
pub fn load_apdd_from_str(xml_content: &str) -> Result<DeviceDescriptor, ApddError> {
    let document: model::ApddDocument = quick_xml::de::from_str(xml_content)?;
    resolver::resolve(&document)
}

// --- Helper Functions (shared with resolver.rs) ---

/// Parses a "0x..." hex or plain decimal string into a u32.
pub(crate) fn parse_u32(s: &str) -> Result<u32, ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

/// Parses a "0x..." hex or plain decimal string into a u16.
pub(crate) fn parse_u16(s: &str) -> Result<u16, ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

/// Parses a "0x..." (or bare) hex payload string into a Vec<u8>.
pub(crate) fn parse_hex_payload(s: &str) -> Result<Vec<u8>, ApddError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    if trimmed.len() % 2 != 0 {
        return Err(ApddError::HexParsing(hex::FromHexError::OddLength));
    }
    hex::decode(trimmed).map_err(ApddError::HexParsing)
}
