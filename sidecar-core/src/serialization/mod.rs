//! Deterministic binary serialization for stored records.
//!
//! Every value written to the key-value store is encoded with bincode under a
//! fixed configuration, so a record read back from disk decodes to exactly
//! the value that was written and rewriting an unchanged record produces
//! identical bytes.

mod bincode_config;

pub use bincode_config::{deserialize, serialize};
