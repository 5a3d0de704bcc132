//! Error types for the descriptor store.

use thiserror::Error;

/// Result type for descriptor store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in descriptor store operations.
///
/// `Unavailable` and `Corrupt` are the recreation triggers: a caller holding
/// a freshly parsed relay set should rebuild the store instead of failing.
/// Everything else is a genuine storage fault.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store does not exist or cannot be opened.
    #[error("descriptor store unavailable at \"{path}\": {reason}")]
    Unavailable { path: String, reason: String },

    /// The store exists but its structure is not recognized.
    #[error("descriptor store at \"{path}\" is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    /// Storage engine error
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}
