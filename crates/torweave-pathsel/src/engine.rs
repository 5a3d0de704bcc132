//! The weight-assignment engine.

use crate::error::{Result, WeightError};
use crate::policy::PathPolicy;
use torweave_consensus::{Consensus, RelayRole, WEIGHT_SCALE};
use torweave_relation::PairMatrix;
use tracing::debug;

/// Per-relay selection state for one run: weights, sums, and related-weight
/// masses, all derived from one consensus and one policy.
#[derive(Debug)]
pub struct PathWeights<'c> {
    consensus: &'c Consensus,
    entry_possible: Vec<bool>,
    exit_possible: Vec<bool>,
    middle_possible: Vec<bool>,
    entry_weights: Vec<f64>,
    exit_weights: Vec<f64>,
    middle_weights: Vec<f64>,
    entry_sum: f64,
    exit_sum: f64,
    middle_sum: f64,
    exit_sum_inv: f64,
    related_entry_mass: Vec<f64>,
    related_middle_mass: Vec<f64>,
}

impl<'c> PathWeights<'c> {
    /// Run the full pipeline: eligibility, weights, related-weight masses.
    ///
    /// Fails with [`WeightError::DegenerateSum`] when a role ends up with no
    /// positive weight at all; no inverse is formed in that case.
    pub fn compute(consensus: &'c Consensus, policy: &impl PathPolicy) -> Result<Self> {
        let n = consensus.len();

        debug!(relays = n, "evaluating role eligibility");
        let mut entry_possible = vec![false; n];
        let mut exit_possible = vec![false; n];
        let mut middle_possible = vec![false; n];
        for (i, relay) in consensus.relays().iter().enumerate() {
            entry_possible[i] = policy.entry_possible(relay);
            exit_possible[i] = policy.exit_possible(relay);
            middle_possible[i] = policy.middle_possible(relay);
        }

        debug!("assigning per-relay weights");
        let mut entry_weights = vec![0.0; n];
        let mut exit_weights = vec![0.0; n];
        let mut middle_weights = vec![0.0; n];
        let mut entry_sum = 0.0;
        let mut exit_sum = 0.0;
        let mut middle_sum = 0.0;
        for (i, relay) in consensus.relays().iter().enumerate() {
            let weight = |role: RelayRole| {
                relay.bandwidth as f64 * consensus.weight_modifier(role, relay.flags) as f64
                    / WEIGHT_SCALE as f64
            };

            if exit_possible[i] {
                exit_weights[i] = weight(RelayRole::Exit);
                exit_sum += exit_weights[i];
            }
            if entry_possible[i] {
                entry_weights[i] = weight(RelayRole::Entry);
                entry_sum += entry_weights[i];
            }
            if middle_possible[i] {
                middle_weights[i] = weight(RelayRole::Middle);
                middle_sum += middle_weights[i];
            }
        }

        for (role, sum) in [
            (RelayRole::Exit, exit_sum),
            (RelayRole::Entry, entry_sum),
            (RelayRole::Middle, middle_sum),
        ] {
            if sum <= 0.0 {
                return Err(WeightError::DegenerateSum { role });
            }
        }
        let exit_sum_inv = 1.0 / exit_sum;

        debug!("aggregating related weight masses");
        // A relay's mass starts with its own weight: subtracting the mass
        // must also rule the relay itself out of the next draw.
        let mut related_entry_mass = entry_weights.clone();
        let mut related_middle_mass = middle_weights.clone();
        let relations = consensus.relations();
        for j in 0..n {
            for i in 0..j {
                if relations.contains(i, j) {
                    related_entry_mass[i] += entry_weights[j];
                    related_entry_mass[j] += entry_weights[i];
                    related_middle_mass[i] += middle_weights[j];
                    related_middle_mass[j] += middle_weights[i];
                }
            }
        }

        debug!(
            exit_sum,
            entry_sum, middle_sum, "weight assignment complete"
        );
        Ok(Self {
            consensus,
            entry_possible,
            exit_possible,
            middle_possible,
            entry_weights,
            exit_weights,
            middle_weights,
            entry_sum,
            exit_sum,
            middle_sum,
            exit_sum_inv,
            related_entry_mass,
            related_middle_mass,
        })
    }

    /// Number of relays covered.
    pub fn len(&self) -> usize {
        self.exit_weights.len()
    }

    /// True when no relays are covered.
    pub fn is_empty(&self) -> bool {
        self.exit_weights.is_empty()
    }

    /// The selection weight of a relay for a role.
    pub fn weight(&self, role: RelayRole, index: usize) -> f64 {
        match role {
            RelayRole::Entry => self.entry_weights[index],
            RelayRole::Exit => self.exit_weights[index],
            RelayRole::Middle => self.middle_weights[index],
        }
    }

    /// The normalizing sum of a role's weights.
    pub fn weight_sum(&self, role: RelayRole) -> f64 {
        match role {
            RelayRole::Entry => self.entry_sum,
            RelayRole::Exit => self.exit_sum,
            RelayRole::Middle => self.middle_sum,
        }
    }

    /// Precomputed `1 / exit_sum`, for repeated exit draws.
    pub fn exit_sum_inv(&self) -> f64 {
        self.exit_sum_inv
    }

    /// Normalized exit-selection probability of a relay.
    pub fn exit_probability(&self, index: usize) -> f64 {
        self.exit_weights[index] * self.exit_sum_inv
    }

    /// Whether the policy admits a relay for a role.
    pub fn possible(&self, role: RelayRole, index: usize) -> bool {
        match role {
            RelayRole::Entry => self.entry_possible[index],
            RelayRole::Exit => self.exit_possible[index],
            RelayRole::Middle => self.middle_possible[index],
        }
    }

    /// The total entry weight a sampler loses when `placed` is already in
    /// the circuit: the relay's own weight plus every related relay's.
    pub fn related_entry_mass(&self, placed: usize) -> f64 {
        self.related_entry_mass[placed]
    }

    /// Middle-role counterpart of [`Self::related_entry_mass`].
    pub fn related_middle_mass(&self, placed: usize) -> f64 {
        self.related_middle_mass[placed]
    }

    /// Entry weight still available once `placed` and its relatives are
    /// excluded. Floored at zero against rounding.
    pub fn remaining_entry_weight(&self, placed: usize) -> f64 {
        (self.entry_sum - self.related_entry_mass[placed]).max(0.0)
    }

    /// Middle-role counterpart of [`Self::remaining_entry_weight`].
    pub fn remaining_middle_weight(&self, placed: usize) -> f64 {
        (self.middle_sum - self.related_middle_mass[placed]).max(0.0)
    }

    /// The composed compatibility predicate for this run.
    pub fn compatibility(&self) -> Compatibility<'_> {
        Compatibility {
            relations: self.consensus.relations(),
            entry_possible: &self.entry_possible,
            exit_possible: &self.exit_possible,
            middle_possible: &self.middle_possible,
        }
    }
}

/// Family/subnet relatedness and role eligibility, composed into the single
/// predicate circuit construction consults.
///
/// The consensus relation matrix is borrowed, never modified: eligibility
/// lives in per-run vectors, so one consensus can serve runs with different
/// policies concurrently.
#[derive(Debug, Clone, Copy)]
pub struct Compatibility<'a> {
    relations: &'a PairMatrix,
    entry_possible: &'a [bool],
    exit_possible: &'a [bool],
    middle_possible: &'a [bool],
}

impl Compatibility<'_> {
    /// May `candidate` be drawn for `role` at all?
    pub fn selectable(&self, candidate: usize, role: RelayRole) -> bool {
        match role {
            RelayRole::Entry => self.entry_possible[candidate],
            RelayRole::Exit => self.exit_possible[candidate],
            RelayRole::Middle => self.middle_possible[candidate],
        }
    }

    /// May `candidate` be drawn for `role` in a circuit that already holds
    /// `placed`?
    ///
    /// False when the candidate is the placed relay itself, is ineligible
    /// for the role, or is related to the placed relay.
    pub fn is_compatible(&self, candidate: usize, placed: usize, role: RelayRole) -> bool {
        candidate != placed
            && self.selectable(candidate, role)
            && !self.relations.contains(candidate, placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::StandardPolicy;
    use std::net::Ipv4Addr;
    use torweave_consensus::{ExitPolicy, Fingerprint, Relay, RelayFlags, WeightModTable};

    fn relay(nickname: &str, fill: u8, bandwidth: u64, flags: RelayFlags) -> Relay {
        Relay {
            nickname: nickname.into(),
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

    fn rv() -> RelayFlags {
        RelayFlags::RUNNING | RelayFlags::VALID
    }

    fn table() -> WeightModTable {
        WeightModTable {
            wed: 7000,
            weg: 2000,
            wee: 10000,
            wem: 10000,
            wgd: 3000,
            wgg: 5500,
            wgm: 5500,
            wmd: 1000,
            wmg: 4500,
            wme: 2000,
            wmm: 10000,
        }
    }

    /// Five relays: a guard, two plain exits, a guard+exit, and a plain
    /// middle. guard~both are family-related; the two exits share a subnet.
    fn five_relay_consensus() -> Consensus {
        let relays = vec![
            relay("guard", 0, 1000, rv() | RelayFlags::GUARD),
            relay("exit", 1, 2000, rv() | RelayFlags::EXIT),
            relay("both", 2, 3000, rv() | RelayFlags::GUARD | RelayFlags::EXIT),
            relay("plain", 3, 4000, rv()),
            relay("bigexit", 4, 5000, rv() | RelayFlags::EXIT),
        ];
        let mut relations = PairMatrix::new(5);
        relations.insert(0, 2);
        relations.insert(1, 4);

        Consensus::from_parts("2024-05-01 12:00:00".into(), relays, relations, table(), 10000)
            .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn weights_match_hand_computation() {
        let consensus = five_relay_consensus();
        let weights = PathWeights::compute(&consensus, &StandardPolicy::default()).unwrap();

        // exit position: bandwidth x modifier / 10000 for eligible exits
        assert_close(weights.weight(RelayRole::Exit, 1), 2000.0); // 2000 x Wee
        assert_close(weights.weight(RelayRole::Exit, 2), 2100.0); // 3000 x Wed
        assert_close(weights.weight(RelayRole::Exit, 4), 5000.0); // 5000 x Wee
        assert_close(weights.weight(RelayRole::Exit, 0), 0.0);
        assert_close(weights.weight_sum(RelayRole::Exit), 9100.0);

        // entry position
        assert_close(weights.weight(RelayRole::Entry, 0), 550.0); // 1000 x Wgg
        assert_close(weights.weight(RelayRole::Entry, 2), 900.0); // 3000 x Wgd
        assert_close(weights.weight(RelayRole::Entry, 1), 0.0);
        assert_close(weights.weight_sum(RelayRole::Entry), 1450.0);

        // middle position: everyone usable
        assert_close(weights.weight(RelayRole::Middle, 0), 450.0); // Wmg
        assert_close(weights.weight(RelayRole::Middle, 1), 400.0); // Wme
        assert_close(weights.weight(RelayRole::Middle, 2), 300.0); // Wmd
        assert_close(weights.weight(RelayRole::Middle, 3), 4000.0); // Wmm
        assert_close(weights.weight(RelayRole::Middle, 4), 1000.0); // Wme
        assert_close(weights.weight_sum(RelayRole::Middle), 6150.0);

        assert_close(weights.exit_sum_inv(), 1.0 / 9100.0);
    }

    #[test]
    fn exit_probabilities_normalize_to_one() {
        let consensus = five_relay_consensus();
        // Everyone exit-eligible: no flag or bandwidth requirements at all.
        let policy = StandardPolicy {
            base_flags: RelayFlags::NONE,
            exit_flags: RelayFlags::NONE,
            ..StandardPolicy::default()
        };
        let weights = PathWeights::compute(&consensus, &policy).unwrap();

        let total: f64 = (0..weights.len()).map(|i| weights.exit_probability(i)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn entry_weight_of_exit_flagged_relay_is_zero_even_when_eligible() {
        let consensus = five_relay_consensus();
        let policy = StandardPolicy {
            base_flags: RelayFlags::NONE,
            entry_flags: RelayFlags::NONE,
            ..StandardPolicy::default()
        };
        let weights = PathWeights::compute(&consensus, &policy).unwrap();

        // Relay 1 carries EXIT without GUARD: the entry modifier is the
        // fixed zero, so eligibility alone gives it no entry weight.
        assert!(weights.possible(RelayRole::Entry, 1));
        assert_close(weights.weight(RelayRole::Entry, 1), 0.0);
    }

    #[test]
    fn related_masses_match_hand_computation() {
        let consensus = five_relay_consensus();
        let weights = PathWeights::compute(&consensus, &StandardPolicy::default()).unwrap();

        // guard(0) ~ both(2): entry masses fold the pair together.
        assert_close(weights.related_entry_mass(0), 550.0 + 900.0);
        assert_close(weights.related_entry_mass(2), 900.0 + 550.0);
        // exit(1) ~ bigexit(4) carry no entry weight at all.
        assert_close(weights.related_entry_mass(1), 0.0);
        assert_close(weights.related_entry_mass(3), 0.0);

        // middle masses: own weight plus related relays'.
        assert_close(weights.related_middle_mass(0), 450.0 + 300.0);
        assert_close(weights.related_middle_mass(1), 400.0 + 1000.0);
        assert_close(weights.related_middle_mass(2), 300.0 + 450.0);
        assert_close(weights.related_middle_mass(3), 4000.0);
        assert_close(weights.related_middle_mass(4), 1000.0 + 400.0);
    }

    #[test]
    fn remaining_weight_subtracts_mass_and_floors_at_zero() {
        let consensus = five_relay_consensus();
        let weights = PathWeights::compute(&consensus, &StandardPolicy::default()).unwrap();

        // Placing bigexit(4) costs no entry weight.
        assert_close(weights.remaining_entry_weight(4), 1450.0);
        // Placing both(2) removes the whole entry pool (guard is family).
        assert_close(weights.remaining_entry_weight(2), 0.0);
        // Placing plain(3) removes only its own middle weight.
        assert_close(weights.remaining_middle_weight(3), 6150.0 - 4000.0);
    }

    #[test]
    fn degenerate_exit_sum_is_reported_not_divided() {
        let consensus = five_relay_consensus();
        // No relay carries the AUTHORITY flag, so no exit qualifies.
        let policy = StandardPolicy {
            exit_flags: RelayFlags::AUTHORITY,
            ..StandardPolicy::default()
        };

        let err = PathWeights::compute(&consensus, &policy).unwrap_err();
        assert_eq!(
            err,
            WeightError::DegenerateSum {
                role: RelayRole::Exit
            }
        );
    }

    #[test]
    fn degenerate_entry_sum_is_distinguished() {
        let consensus = five_relay_consensus();
        let policy = StandardPolicy {
            entry_flags: RelayFlags::AUTHORITY,
            ..StandardPolicy::default()
        };

        let err = PathWeights::compute(&consensus, &policy).unwrap_err();
        assert_eq!(
            err,
            WeightError::DegenerateSum {
                role: RelayRole::Entry
            }
        );
    }

    #[test]
    fn empty_consensus_is_degenerate() {
        let consensus = Consensus::from_parts(
            "2024-05-01 12:00:00".into(),
            Vec::new(),
            PairMatrix::new(0),
            table(),
            0,
        )
        .unwrap();

        let err = PathWeights::compute(&consensus, &StandardPolicy::default()).unwrap_err();
        assert!(matches!(err, WeightError::DegenerateSum { .. }));
    }

    #[test]
    fn compatibility_composes_relatedness_and_eligibility() {
        let consensus = five_relay_consensus();
        let weights = PathWeights::compute(&consensus, &StandardPolicy::default()).unwrap();
        let compat = weights.compatibility();

        // Family-related pair: never compatible, for any role.
        assert!(!compat.is_compatible(0, 2, RelayRole::Entry));
        assert!(!compat.is_compatible(2, 0, RelayRole::Exit));

        // A relay is never compatible with itself.
        assert!(!compat.is_compatible(3, 3, RelayRole::Middle));

        // Role eligibility folds into the same predicate: plain(3) is no
        // entry candidate even though it is unrelated to bigexit(4).
        assert!(compat.selectable(3, RelayRole::Middle));
        assert!(!compat.selectable(3, RelayRole::Entry));
        assert!(!compat.is_compatible(3, 4, RelayRole::Entry));
        assert!(compat.is_compatible(3, 4, RelayRole::Middle));

        // Unrelated, eligible pair passes.
        assert!(compat.is_compatible(0, 4, RelayRole::Entry));
    }
}
