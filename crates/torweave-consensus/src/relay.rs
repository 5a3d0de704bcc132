//! Relay entity and circuit roles.

use crate::fingerprint::Fingerprint;
use crate::flags::RelayFlags;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// The position a relay occupies in a three-hop circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayRole {
    /// First hop (guard position).
    Entry,
    /// Last hop.
    Exit,
    /// Any hop in between.
    Middle,
}

impl std::fmt::Display for RelayRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayRole::Entry => write!(f, "entry"),
            RelayRole::Exit => write!(f, "exit"),
            RelayRole::Middle => write!(f, "middle"),
        }
    }
}

/// An inclusive port range in an exit-policy summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub lo: u16,
    pub hi: u16,
}

impl PortRange {
    /// A range with `lo <= hi`; `None` otherwise.
    pub fn new(lo: u16, hi: u16) -> Option<Self> {
        (lo <= hi).then_some(Self { lo, hi })
    }

    /// A single port.
    pub const fn single(port: u16) -> Self {
        Self { lo: port, hi: port }
    }

    fn contains(self, port: u16) -> bool {
        self.lo <= port && port <= self.hi
    }
}

/// A relay's exit-policy summary: which target ports it will connect to.
///
/// Mirrors the document's `p accept ...` / `p reject ...` form: one polarity
/// plus the listed port ranges. A status entry without a policy line is
/// treated as accepting everything; the EXIT flag still gates whether the
/// relay is an exit at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPolicy {
    accept: bool,
    ports: Vec<PortRange>,
}

impl ExitPolicy {
    /// A policy that allows every port (rejects nothing).
    pub fn accept_all() -> Self {
        Self {
            accept: false,
            ports: Vec::new(),
        }
    }

    /// A policy that allows no port (accepts nothing).
    pub fn reject_all() -> Self {
        Self {
            accept: true,
            ports: Vec::new(),
        }
    }

    /// A policy allowing exactly the listed ranges.
    pub fn accepting(ports: Vec<PortRange>) -> Self {
        Self {
            accept: true,
            ports,
        }
    }

    /// A policy allowing everything but the listed ranges.
    pub fn rejecting(ports: Vec<PortRange>) -> Self {
        Self {
            accept: false,
            ports,
        }
    }

    /// Does this policy allow connections to `port`?
    pub fn allows(&self, port: u16) -> bool {
        let listed = self.ports.iter().any(|range| range.contains(port));
        if self.accept {
            listed
        } else {
            !listed
        }
    }
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self::accept_all()
    }
}

/// One relay as described by a consensus status entry, enriched with
/// descriptor data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    /// Operator-chosen name; not unique across the network.
    pub nickname: String,
    /// Stable identity, unique within one consensus.
    pub fingerprint: Fingerprint,
    /// Advertised IPv4 address.
    pub address: Ipv4Addr,
    /// OR port.
    pub or_port: u16,
    /// Declared bandwidth.
    pub bandwidth: u64,
    /// Consensus flag set.
    pub flags: RelayFlags,
    /// Exit-policy summary from the status entry's `p` line.
    pub exit_policy: ExitPolicy,
    /// Family members this relay declares, as `$FINGERPRINT` or nickname
    /// references. Empty until enrichment.
    pub family: Vec<String>,
    /// Platform string from the server descriptor. Empty until enrichment.
    pub platform: String,
    /// Two-letter country code. Empty until enrichment.
    pub country: String,
}

impl Relay {
    /// The top `prefix_len` bits of the relay's address, for subnet
    /// relatedness checks.
    pub fn subnet_prefix(&self, prefix_len: u8) -> u32 {
        let addr = u32::from(self.address);
        if prefix_len == 0 {
            0
        } else if prefix_len >= 32 {
            addr
        } else {
            addr >> (32 - prefix_len)
        }
    }

    /// True when this relay's declared family names `other`, either by
    /// `$`-prefixed fingerprint (case-insensitive) or by nickname.
    pub fn declares_in_family(&self, other: &Relay) -> bool {
        self.family.iter().any(|entry| match entry.strip_prefix('$') {
            Some(fp) => fp.eq_ignore_ascii_case(&other.fingerprint.to_hex()),
            None => entry == &other.nickname,
        })
    }
}
