//! Relay flag bitset.

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// The flag set a consensus assigns to one relay.
///
/// Stored as a bitset; only GUARD and EXIT influence weight-modifier
/// dispatch, but the full vocabulary of a status entry's `s` line is kept so
/// policies can filter on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RelayFlags(u32);

impl RelayFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);

    pub const AUTHORITY: Self = Self(1);
    pub const BAD_EXIT: Self = Self(1 << 1);
    pub const EXIT: Self = Self(1 << 2);
    pub const FAST: Self = Self(1 << 3);
    pub const GUARD: Self = Self(1 << 4);
    pub const HSDIR: Self = Self(1 << 5);
    pub const RUNNING: Self = Self(1 << 6);
    pub const STABLE: Self = Self(1 << 7);
    pub const V2DIR: Self = Self(1 << 8);
    pub const VALID: Self = Self(1 << 9);

    /// Look up a flag by its document name.
    ///
    /// Names not in the vocabulary return `None`; the parser skips them so
    /// documents with newer flags still load.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Authority" => Some(Self::AUTHORITY),
            "BadExit" => Some(Self::BAD_EXIT),
            "Exit" => Some(Self::EXIT),
            "Fast" => Some(Self::FAST),
            "Guard" => Some(Self::GUARD),
            "HSDir" => Some(Self::HSDIR),
            "Running" => Some(Self::RUNNING),
            "Stable" => Some(Self::STABLE),
            "V2Dir" => Some(Self::V2DIR),
            "Valid" => Some(Self::VALID),
            _ => None,
        }
    }

    /// The raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every flag in `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any flag in `other` is set in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Set all flags in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for RelayFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RelayFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RelayFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}
