//! Error types for weight assignment.

use thiserror::Error;
use torweave_consensus::RelayRole;

/// Result type for weight-assignment operations.
pub type Result<T> = std::result::Result<T, WeightError>;

/// Errors that can occur while building selection weights.
///
/// These are failures of one weight-assignment run, not of the consensus:
/// the same consensus may still succeed under a different policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WeightError {
    /// No eligible relay carries positive weight for a role, so no
    /// normalized distribution exists for it.
    #[error("no relay carries positive {role} weight under the supplied policy")]
    DegenerateSum { role: RelayRole },
}
