// src/lib.rs

#![no_std]
#![doc = "Parses APDD (device descriptor) XML files."]
#![doc = ""]
#![doc = "This `no_std + alloc` library deserializes the subset of the APDD"]
#![doc = "schema that drives process-data layouts and parameter access, and"]
#![doc = "resolves it into the `slotbus-rs` descriptor model."]
#![doc = ""]
#![doc = "Entry point: `load_apdd_from_str`."]

extern crate alloc;

// --- Crate Modules ---

mod error;
mod model;
mod parser;
mod resolver;

// --- Public API Re-exports ---

pub use error::ApddError;
pub use parser::load_apdd_from_str;
