//! Symmetric Relay Relations
//!
//! A boolean relation over a dense index space of n relays, packed into
//! `n(n-1)/2` bits (one bit per unordered pair). Used for family/subnet
//! relatedness between relays and, composed with eligibility vectors, as the
//! compatibility predicate during circuit construction.
//!
//! # Storage
//!
//! Only the strict lower triangle is stored. `set(i, j, v)` and `set(j, i, v)`
//! address the same bit, so symmetry is a property of the storage itself and
//! never a caller obligation. The diagonal is pinned to `false`: a relay is
//! not related to itself.

mod matrix;

pub use matrix::{PairMatrix, RelatedIndices};

use thiserror::Error;

/// Result type for relation operations.
pub type Result<T> = std::result::Result<T, RelationError>;

/// Errors that can occur when addressing a pair relation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelationError {
    /// An index is outside the relation's index space.
    #[error("index {index} out of bounds for relation over {len} items")]
    OutOfBounds { index: usize, len: usize },

    /// Writes to the diagonal are rejected; `(i, i)` is always `false`.
    #[error("diagonal entry ({index}, {index}) is not writable")]
    Diagonal { index: usize },

    /// Bit storage does not match the declared item count.
    #[error("bit storage has {got} words, expected {expected} for {len} items")]
    StorageMismatch {
        len: usize,
        expected: usize,
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry_is_structural() {
        let mut m = PairMatrix::new(4);
        m.set(1, 3, true).unwrap();

        assert!(m.get(1, 3).unwrap());
        assert!(m.get(3, 1).unwrap());

        m.set(3, 1, false).unwrap();
        assert!(!m.get(1, 3).unwrap());
    }

    #[test]
    fn diagonal_reads_false_and_rejects_writes() {
        let mut m = PairMatrix::new(3);
        assert_eq!(m.get(2, 2), Ok(false));
        assert_eq!(m.set(2, 2, true), Err(RelationError::Diagonal { index: 2 }));
    }
}
