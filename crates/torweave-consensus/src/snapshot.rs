//! Binary snapshot persistence.
//!
//! The snapshot is a versioned bincode record of every owned field except
//! the fingerprint map, which is derivable from the registry and rebuilt on
//! load. Round-trip equality with the in-memory model is a hard contract.

use crate::error::{ConsensusError, Result};
use crate::model::Consensus;
use crate::relay::Relay;
use crate::weights::WeightModTable;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use torweave_relation::PairMatrix;
use tracing::info;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    valid_after: &'a str,
    max_modifier: u64,
    weight_mods: &'a WeightModTable,
    relays: &'a [Relay],
    relations: &'a PairMatrix,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    version: u32,
    valid_after: String,
    max_modifier: u64,
    weight_mods: WeightModTable,
    relays: Vec<Relay>,
    relations: PairMatrix,
}

pub(crate) fn save(consensus: &Consensus, path: &Path) -> Result<()> {
    let file_name = path.display().to_string();
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        valid_after: consensus.valid_after(),
        max_modifier: consensus.max_modifier(),
        weight_mods: consensus.weight_mods(),
        relays: consensus.relays(),
        relations: consensus.relations(),
    };

    let file = File::create(path).map_err(|e| ConsensusError::SnapshotWrite {
        file: file_name.clone(),
        reason: e.to_string(),
    })?;
    bincode::serialize_into(BufWriter::new(file), &snapshot).map_err(|e| {
        ConsensusError::SnapshotWrite {
            file: file_name.clone(),
            reason: e.to_string(),
        }
    })?;

    info!(file = %file_name, relays = consensus.len(), "saved consensus snapshot");
    Ok(())
}

pub(crate) fn load(path: &Path) -> Result<Consensus> {
    let file_name = path.display().to_string();
    let read_err = |reason: String| ConsensusError::SnapshotRead {
        file: file_name.clone(),
        reason,
    };

    let file = File::open(path).map_err(|_| ConsensusError::OpenFile {
        file: file_name.clone(),
    })?;
    let snapshot: SnapshotOwned =
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| read_err(e.to_string()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(read_err(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }

    // Re-run the storage-shape check; a crafted or damaged file could pair a
    // bit vector with the wrong item count.
    let relations = PairMatrix::from_parts(
        snapshot.relations.len(),
        snapshot.relations.words().to_vec(),
    )
    .map_err(|e| read_err(e.to_string()))?;

    let consensus = Consensus::from_parts(
        snapshot.valid_after,
        snapshot.relays,
        relations,
        snapshot.weight_mods,
        snapshot.max_modifier,
    )?;

    info!(file = %file_name, relays = consensus.len(), "loaded consensus snapshot");
    Ok(consensus)
}
