// crates/slotbus-rs-apdd/src/error.rs

use alloc::fmt;
use alloc::string::String;
use core::num::ParseIntError;
use hex::FromHexError;
use quick_xml::errors::serialize::DeError;

/// Errors that can occur while parsing an APDD document.
#[derive(Debug)]
pub enum ApddError {
    /// An error from the underlying `quick-xml` deserializer.
    XmlParsing(DeError),

    /// A `defaultValue` or `moduleCode` attribute contained invalid hex.
    HexParsing(FromHexError),

    /// A required XML element was missing (e.g., VariantList).
    MissingElement { element: &'static str },

    /// A numeric attribute (e.g., @moduleCode) had an invalid format.
    InvalidAttributeFormat { attribute: &'static str },

    /// An attribute held a value outside its closed vocabulary
    /// (e.g., an unknown @dataType keyword).
    InvalidAttributeValue {
        attribute: &'static str,
        value: String,
    },

    /// An id reference points at nothing (e.g., @enumRef to a missing
    /// EnumType).
    UnknownReference { kind: &'static str, id: String },
}

impl From<DeError> for ApddError {
    fn from(e: DeError) -> Self {
        ApddError::XmlParsing(e)
    }
}

impl From<FromHexError> for ApddError {
    fn from(e: FromHexError) -> Self {
        ApddError::HexParsing(e)
    }
}

/// Converts `ParseIntError` (typically from reading a numeric attribute)
/// into a user-friendly error.
impl From<ParseIntError> for ApddError {
    fn from(_: ParseIntError) -> Self {
        ApddError::InvalidAttributeFormat {
            attribute: "numeric attribute",
        }
    }
}

impl fmt::Display for ApddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApddError::XmlParsing(e) => write!(f, "XML parsing error: {}", e),
            ApddError::HexParsing(e) => write!(f, "Hex parsing error: {}", e),
            ApddError::MissingElement { element } => {
                write!(f, "Missing required XML element: {}", element)
            }
            ApddError::InvalidAttributeFormat { attribute } => {
                write!(f, "Invalid format for attribute: {}", attribute)
            }
            ApddError::InvalidAttributeValue { attribute, value } => {
                write!(f, "Invalid value '{}' for attribute: {}", value, attribute)
            }
            ApddError::UnknownReference { kind, id } => {
                write!(f, "Reference to unknown {}: '{}'", kind, id)
            }
        }
    }
}
