//! Directory Consensus Model
//!
//! An immutable in-memory snapshot of network-wide relay state, built from a
//! textual consensus document plus a descriptor store, or reloaded from a
//! binary snapshot.
//!
//! # Structure
//!
//! A [`Consensus`] owns:
//! - the ordered relay registry (document order is registry order; the dense
//!   index is the canonical identity used everywhere else),
//! - a fingerprint → index map,
//! - a symmetric relation matrix marking family/subnet relatedness,
//! - the bandwidth-weight modifier table and the maximum modifier value seen
//!   while parsing,
//! - the document's declared `valid-after` timestamp.
//!
//! Once constructed it exposes a read-only query surface and may be shared
//! across any number of concurrent consumers.

mod document;
mod error;
mod fingerprint;
mod flags;
mod model;
mod relay;
mod snapshot;
mod weights;

pub use error::{ConsensusError, Result};
pub use fingerprint::{Fingerprint, FINGERPRINT_LEN};
pub use flags::RelayFlags;
pub use model::{Consensus, EnrichOptions};
pub use relay::{ExitPolicy, PortRange, Relay, RelayRole};
pub use weights::{WeightModTable, WEIGHT_SCALE};
