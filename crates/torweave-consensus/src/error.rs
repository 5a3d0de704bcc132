//! Error types for consensus construction.

use thiserror::Error;

/// Result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Errors that can occur while building a consensus.
///
/// Every variant is a machine-readable reason; the display text is the single
/// human-readable message for that failure. Parse-time failures abort the
/// whole construction: no partially built [`crate::Consensus`] is ever
/// returned.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The consensus document (or descriptor database) cannot be opened.
    #[error("could not open file: \"{file}\"")]
    OpenFile { file: String },

    /// The document is too short to be a consensus at all.
    #[error("file \"{file}\" is not a valid consensus file (insufficient content)")]
    InsufficientFile { file: String },

    /// A line violates the token grammar for its section. Carries the exact
    /// offending line so the failure is diagnosable without re-reading the
    /// document.
    #[error("could not parse file: \"{file}\" at \"{line}\"")]
    InvalidFormat { file: String, line: String },

    /// A binary snapshot could not be read back into a model.
    #[error("could not read snapshot \"{file}\": {reason}")]
    SnapshotRead { file: String, reason: String },

    /// A binary snapshot could not be written.
    #[error("could not write snapshot \"{file}\": {reason}")]
    SnapshotWrite { file: String, reason: String },

    /// Parts handed to [`crate::Consensus::from_parts`] do not form a
    /// coherent model.
    #[error("inconsistent consensus parts: {0}")]
    Inconsistent(String),
}
