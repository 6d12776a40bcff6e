#![cfg_attr(not(feature = "std"), no_std)]

// 'alloc' is used for dynamic allocation (e.g., Vec<u8> in frames)
extern crate alloc;

// --- Foundation Modules ---
pub mod hal;
pub mod types;

// --- Descriptor Layer ---
pub mod channel;
pub mod descriptor;

// --- Process Data ---
pub mod codec;
pub mod registers;

// --- Parameter Access ---
pub mod param;

// --- Chain Runtime ---
pub mod catalog;
pub mod chain;
pub mod module;

#[cfg(test)]
pub(crate) mod test_transport;

// --- Top-level Exports ---
pub use chain::{Coupler, DiagnosisBlock};
pub use channel::{Channel, build_channels};
pub use codec::{ProcessValue, decode_frame, encode_frame};
pub use descriptor::{DataKind, DeviceDescriptor, Direction, Variant, resolve_variant};
pub use hal::{FieldbusError, ProtocolError, RegisterTransport, TransportError};
pub use module::{ModuleInfo, ModuleRuntime};
pub use param::ProtocolConfig;
