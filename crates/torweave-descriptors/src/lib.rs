//! Relay Descriptor Store
//!
//! Persistent per-relay descriptor data (declared family, platform, country)
//! keyed by fingerprint, backed by RocksDB with JSON values.
//!
//! The consensus document itself carries per-relay status (identity,
//! address, bandwidth, flags, exit policy); the fields here come from server
//! descriptors collected out of band. The store is best-effort: when it is
//! missing or its
//! structure is not recognized, the caller recreates it from the relay set it
//! just parsed and proceeds with default records rather than failing.

mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::{DescriptorRecord, DescriptorStore};
