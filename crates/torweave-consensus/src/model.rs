//! The consensus model and its construction pipeline.

use crate::document::parse_document;
use crate::error::{ConsensusError, Result};
use crate::fingerprint::Fingerprint;
use crate::flags::RelayFlags;
use crate::relay::{Relay, RelayRole};
use crate::snapshot;
use crate::weights::WeightModTable;
use std::collections::HashMap;
use std::path::Path;
use torweave_descriptors::{DescriptorStore, StoreError};
use torweave_relation::PairMatrix;
use tracing::{debug, warn};

/// Options for the enrichment step.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Address prefix length two relays must share to count as related.
    pub subnet_prefix_len: u8,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            subnet_prefix_len: 16,
        }
    }
}

/// An immutable snapshot of network state as of one `valid-after` timestamp.
///
/// Index `i` into the registry is the canonical relay identity used by the
/// relation matrix and the fingerprint map. There is no mutation surface
/// after construction; share freely across concurrent consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    relays: Vec<Relay>,
    fingerprint_map: HashMap<Fingerprint, usize>,
    relations: PairMatrix,
    weight_mods: WeightModTable,
    valid_after: String,
    max_modifier: u64,
}

impl Consensus {
    /// Build a consensus from a document and a descriptor database.
    pub fn load(document: &Path, db_path: &Path) -> Result<Self> {
        Self::load_with_options(document, db_path, EnrichOptions::default())
    }

    /// [`Consensus::load`] with explicit enrichment options.
    pub fn load_with_options(
        document: &Path,
        db_path: &Path,
        options: EnrichOptions,
    ) -> Result<Self> {
        let mut parsed = parse_document(document)?;
        enrich(&mut parsed.relays, db_path)?;
        let relations = build_relations(&parsed.relays, &options);

        Ok(Self {
            relays: parsed.relays,
            fingerprint_map: parsed.fingerprint_map,
            relations,
            weight_mods: parsed.weight_mods,
            valid_after: parsed.valid_after,
            max_modifier: parsed.max_modifier,
        })
    }

    /// Reload a consensus from a binary snapshot written by
    /// [`Consensus::save_snapshot`].
    pub fn from_snapshot(path: &Path) -> Result<Self> {
        snapshot::load(path)
    }

    /// Assemble a consensus from already-built parts, validating coherence.
    ///
    /// The fingerprint map is derived from the registry. Used by snapshot
    /// loading and by simulations that construct synthetic networks.
    pub fn from_parts(
        valid_after: String,
        relays: Vec<Relay>,
        relations: PairMatrix,
        weight_mods: WeightModTable,
        max_modifier: u64,
    ) -> Result<Self> {
        if relations.len() != relays.len() {
            return Err(ConsensusError::Inconsistent(format!(
                "relation matrix covers {} items but registry holds {} relays",
                relations.len(),
                relays.len()
            )));
        }

        let mut fingerprint_map = HashMap::with_capacity(relays.len());
        for (index, relay) in relays.iter().enumerate() {
            if fingerprint_map.insert(relay.fingerprint, index).is_some() {
                return Err(ConsensusError::Inconsistent(format!(
                    "duplicate fingerprint {}",
                    relay.fingerprint
                )));
            }
        }

        Ok(Self {
            relays,
            fingerprint_map,
            relations,
            weight_mods,
            valid_after,
            max_modifier,
        })
    }

    /// Persist the full model to a binary snapshot.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        snapshot::save(self, path)
    }

    /// The relay at a registry position.
    ///
    /// Panics if `index` is out of range, like slice indexing.
    pub fn relay(&self, index: usize) -> &Relay {
        &self.relays[index]
    }

    /// All relays, in registry order.
    pub fn relays(&self) -> &[Relay] {
        &self.relays
    }

    /// Number of relays in the consensus.
    pub fn len(&self) -> usize {
        self.relays.len()
    }

    /// True when the consensus holds no relays.
    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// The relay with the given fingerprint, `None` when unknown.
    pub fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<&Relay> {
        self.fingerprint_map
            .get(fingerprint)
            .map(|&index| &self.relays[index])
    }

    /// Registry position of the given fingerprint, `None` when unknown.
    pub fn index_of(&self, fingerprint: &Fingerprint) -> Option<usize> {
        self.fingerprint_map.get(fingerprint).copied()
    }

    /// True when two relays share a subnet or either declares the other as
    /// family. Panics on out-of-range indices.
    pub fn is_related(&self, a: usize, b: usize) -> bool {
        self.relations.contains(a, b)
    }

    /// The relation matrix itself.
    pub fn relations(&self) -> &PairMatrix {
        &self.relations
    }

    /// The bandwidth-weight modifier for a role and flag set.
    pub fn weight_modifier(&self, role: RelayRole, flags: RelayFlags) -> u64 {
        self.weight_mods.modifier(role, flags)
    }

    /// The full modifier table.
    pub fn weight_mods(&self) -> &WeightModTable {
        &self.weight_mods
    }

    /// The maximum modifier value observed while parsing the document.
    pub fn max_modifier(&self) -> u64 {
        self.max_modifier
    }

    /// The document's declared validity timestamp.
    pub fn valid_after(&self) -> &str {
        &self.valid_after
    }
}

/// Attach descriptor data to each relay, recreating the store when it is
/// absent or broken.
///
/// Only a hard storage fault (recreation itself failing) aborts the build;
/// it surfaces as an open failure on the database file.
fn enrich(relays: &mut [Relay], db_path: &Path) -> Result<()> {
    let store = match DescriptorStore::open(db_path) {
        Ok(store) => store,
        Err(err @ (StoreError::Unavailable { .. } | StoreError::Corrupt { .. })) => {
            warn!(%err, "descriptor store unusable, recreating from parsed relays");
            recreate(db_path, relays)?
        }
        Err(_) => return Err(db_open_error(db_path)),
    };

    match apply_descriptors(relays, &store) {
        Ok(found) => {
            debug!(found, total = relays.len(), "applied descriptor records");
            Ok(())
        }
        Err(err @ StoreError::Corrupt { .. }) => {
            warn!(%err, "descriptor records unreadable, recreating from parsed relays");
            drop(store);
            let fresh = recreate(db_path, relays)?;
            apply_descriptors(relays, &fresh).map_err(|_| db_open_error(db_path))?;
            Ok(())
        }
        Err(_) => Err(db_open_error(db_path)),
    }
}

fn recreate(db_path: &Path, relays: &[Relay]) -> Result<DescriptorStore> {
    let fingerprints: Vec<String> = relays.iter().map(|r| r.fingerprint.to_hex()).collect();
    DescriptorStore::recreate_from(db_path, fingerprints.iter().map(String::as_str))
        .map_err(|_| db_open_error(db_path))
}

fn db_open_error(db_path: &Path) -> ConsensusError {
    ConsensusError::OpenFile {
        file: db_path.display().to_string(),
    }
}

fn apply_descriptors(
    relays: &mut [Relay],
    store: &DescriptorStore,
) -> torweave_descriptors::Result<usize> {
    let mut found = 0usize;
    for relay in relays.iter_mut() {
        if let Some(record) = store.get(&relay.fingerprint.to_hex())? {
            relay.family = record.family;
            relay.platform = record.platform;
            relay.country = record.country;
            found += 1;
        }
    }
    Ok(found)
}

/// The O(n^2) relatedness pass: same subnet prefix, or a family declaration
/// in either direction.
fn build_relations(relays: &[Relay], options: &EnrichOptions) -> PairMatrix {
    let mut matrix = PairMatrix::new(relays.len());
    let prefix = options.subnet_prefix_len;

    for j in 0..relays.len() {
        for i in 0..j {
            let (a, b) = (&relays[i], &relays[j]);
            let related = a.subnet_prefix(prefix) == b.subnet_prefix(prefix)
                || a.declares_in_family(b)
                || b.declares_in_family(a);
            if related {
                matrix.insert(i, j);
            }
        }
    }

    debug!(
        relays = relays.len(),
        pairs = matrix.count_pairs(),
        "built relation matrix"
    );
    matrix
}
