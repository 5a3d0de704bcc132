//! Role-eligibility policies.

use std::collections::HashSet;
use torweave_consensus::{Fingerprint, Relay, RelayFlags};

/// Supplies per-relay role eligibility to the weight-assignment engine.
///
/// Implementations must be pure functions of the relay's attributes: the
/// engine evaluates each relay exactly once and caches the result for the
/// run.
pub trait PathPolicy {
    /// May this relay serve as the entry hop?
    fn entry_possible(&self, relay: &Relay) -> bool;

    /// May this relay serve as the exit hop?
    fn exit_possible(&self, relay: &Relay) -> bool;

    /// May this relay serve as a middle hop?
    ///
    /// Any relay not otherwise excluded can relay traffic mid-circuit.
    fn middle_possible(&self, _relay: &Relay) -> bool {
        true
    }
}

/// The default eligibility rules: flag requirements per role, a bandwidth
/// floor, and an explicit exclusion list.
#[derive(Debug, Clone)]
pub struct StandardPolicy {
    /// Minimum declared bandwidth for any role.
    pub min_bandwidth: u64,
    /// Flags a relay must carry to be usable at all.
    pub base_flags: RelayFlags,
    /// Flags required on top of `base_flags` for the entry position.
    pub entry_flags: RelayFlags,
    /// Flags required on top of `base_flags` for the exit position.
    pub exit_flags: RelayFlags,
    /// Flags that disqualify a relay from the exit position.
    pub exit_forbidden: RelayFlags,
    /// When set, exits must allow connections to this port.
    pub target_port: Option<u16>,
    /// Relays never used in any position.
    pub excluded: HashSet<Fingerprint>,
}

impl Default for StandardPolicy {
    fn default() -> Self {
        Self {
            min_bandwidth: 0,
            base_flags: RelayFlags::RUNNING | RelayFlags::VALID,
            entry_flags: RelayFlags::GUARD,
            exit_flags: RelayFlags::EXIT,
            exit_forbidden: RelayFlags::BAD_EXIT,
            target_port: None,
            excluded: HashSet::new(),
        }
    }
}

impl StandardPolicy {
    fn usable(&self, relay: &Relay) -> bool {
        relay.bandwidth >= self.min_bandwidth
            && relay.flags.contains(self.base_flags)
            && !self.excluded.contains(&relay.fingerprint)
    }
}

impl PathPolicy for StandardPolicy {
    fn entry_possible(&self, relay: &Relay) -> bool {
        self.usable(relay) && relay.flags.contains(self.entry_flags)
    }

    fn exit_possible(&self, relay: &Relay) -> bool {
        self.usable(relay)
            && relay.flags.contains(self.exit_flags)
            && !relay.flags.intersects(self.exit_forbidden)
            && self
                .target_port
                .map_or(true, |port| relay.exit_policy.allows(port))
    }

    fn middle_possible(&self, relay: &Relay) -> bool {
        self.usable(relay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use torweave_consensus::{ExitPolicy, PortRange};

    fn relay(fill: u8, bandwidth: u64, flags: RelayFlags) -> Relay {
        Relay {
            nickname: format!("relay{fill}"),
            fingerprint: Fingerprint::from_bytes([fill; 20]),
            address: Ipv4Addr::new(10, fill, 0, 1),
            or_port: 9001,
            bandwidth,
            flags,
            exit_policy: ExitPolicy::default(),
            family: Vec::new(),
            platform: String::new(),
            country: String::new(),
        }
    }

    fn running_valid() -> RelayFlags {
        RelayFlags::RUNNING | RelayFlags::VALID
    }

    #[test]
    fn entry_needs_guard_flag() {
        let policy = StandardPolicy::default();
        let guard = relay(1, 1000, running_valid() | RelayFlags::GUARD);
        let plain = relay(2, 1000, running_valid());

        assert!(policy.entry_possible(&guard));
        assert!(!policy.entry_possible(&plain));
    }

    #[test]
    fn exit_needs_exit_flag_and_no_bad_exit() {
        let policy = StandardPolicy::default();
        let exit = relay(1, 1000, running_valid() | RelayFlags::EXIT);
        let bad = relay(2, 1000, running_valid() | RelayFlags::EXIT | RelayFlags::BAD_EXIT);

        assert!(policy.exit_possible(&exit));
        assert!(!policy.exit_possible(&bad));
        // A bad exit can still serve elsewhere.
        assert!(policy.middle_possible(&bad));
    }

    #[test]
    fn bandwidth_floor_applies_to_every_role() {
        let policy = StandardPolicy {
            min_bandwidth: 500,
            ..StandardPolicy::default()
        };
        let slow = relay(1, 499, running_valid() | RelayFlags::GUARD | RelayFlags::EXIT);

        assert!(!policy.entry_possible(&slow));
        assert!(!policy.exit_possible(&slow));
        assert!(!policy.middle_possible(&slow));
    }

    #[test]
    fn exclusion_list_wins_over_flags() {
        let target = relay(7, 9000, running_valid() | RelayFlags::GUARD | RelayFlags::EXIT);
        let policy = StandardPolicy {
            excluded: [target.fingerprint].into_iter().collect(),
            ..StandardPolicy::default()
        };

        assert!(!policy.entry_possible(&target));
        assert!(!policy.exit_possible(&target));
        assert!(!policy.middle_possible(&target));
    }

    #[test]
    fn target_port_checks_exit_policy() {
        let mut web_only = relay(1, 1000, running_valid() | RelayFlags::EXIT);
        web_only.exit_policy =
            ExitPolicy::accepting(vec![PortRange::single(80), PortRange::single(443)]);

        let https = StandardPolicy {
            target_port: Some(443),
            ..StandardPolicy::default()
        };
        let ssh = StandardPolicy {
            target_port: Some(22),
            ..StandardPolicy::default()
        };

        assert!(https.exit_possible(&web_only));
        assert!(!ssh.exit_possible(&web_only));
        // The policy only constrains the exit position.
        assert!(ssh.middle_possible(&web_only));
    }

    #[test]
    fn non_running_relays_are_unusable() {
        let policy = StandardPolicy::default();
        let down = relay(1, 1000, RelayFlags::GUARD | RelayFlags::VALID);
        assert!(!policy.entry_possible(&down));
        assert!(!policy.middle_possible(&down));
    }
}
