//! Persistent descriptor storage using RocksDB.

use crate::error::{Result, StoreError};
use rocksdb::{Options, DB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Schema marker value; bumped when the record layout changes.
const SCHEMA_VERSION: &[u8] = b"torweave-descriptors-v1";

/// Key holding the schema marker.
const SCHEMA_KEY: &[u8] = b"meta:schema";

/// Descriptor-derived attributes for one relay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DescriptorRecord {
    /// Family members this relay declares, as `$FINGERPRINT` or nickname
    /// references.
    pub family: Vec<String>,
    /// Platform string from the server descriptor.
    pub platform: String,
    /// Two-letter country code, empty when unknown.
    pub country: String,
}

/// Storage backend for relay descriptors.
pub struct DescriptorStore {
    db: DB,
    path: PathBuf,
}

impl DescriptorStore {
    /// Open an existing store, verifying its schema marker.
    ///
    /// Returns [`StoreError::Unavailable`] when nothing usable exists at
    /// `path` and [`StoreError::Corrupt`] when something exists but is not a
    /// descriptor store of the expected layout. Both mean: recreate.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let opts = Options::default();
        let db = DB::open(&opts, &path).map_err(|e| StoreError::Unavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        match db.get(SCHEMA_KEY)? {
            Some(marker) if marker == SCHEMA_VERSION => {
                debug!(path = %path.display(), "opened descriptor store");
                Ok(Self { db, path })
            }
            Some(_) => Err(StoreError::Corrupt {
                path: path.display().to_string(),
                reason: "unrecognized schema marker".into(),
            }),
            None => Err(StoreError::Corrupt {
                path: path.display().to_string(),
                reason: "schema marker missing".into(),
            }),
        }
    }

    /// Create a fresh, empty store at `path`, destroying any previous state.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Whatever was there is unusable; clear it before reopening.
        let _ = DB::destroy(&Options::default(), &path);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, &path).map_err(|e| StoreError::Unavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        db.put(SCHEMA_KEY, SCHEMA_VERSION)?;

        info!(path = %path.display(), "created descriptor store");
        Ok(Self { db, path })
    }

    /// Create a fresh store populated with default records for the given
    /// fingerprints.
    ///
    /// This is the recovery path: the caller has a parsed relay set but no
    /// usable descriptors, so every relay starts with an empty family and
    /// unknown platform/country.
    pub fn recreate_from<'a, P, I>(path: P, fingerprints: I) -> Result<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = &'a str>,
    {
        let store = Self::create(path)?;
        let mut count = 0usize;
        for fingerprint in fingerprints {
            store.put(fingerprint, &DescriptorRecord::default())?;
            count += 1;
        }
        info!(relays = count, "descriptor store repopulated with defaults");
        Ok(store)
    }

    /// Store a descriptor record for a relay.
    pub fn put(&self, fingerprint: &str, record: &DescriptorRecord) -> Result<()> {
        let key = format!("desc:{fingerprint}");
        let value = serde_json::to_vec(record)?;
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    /// Get the descriptor record for a relay, `None` when the fingerprint is
    /// simply not present.
    ///
    /// An undecodable record means the store's structure is broken, not that
    /// the relay is unknown, and surfaces as [`StoreError::Corrupt`].
    pub fn get(&self, fingerprint: &str) -> Result<Option<DescriptorRecord>> {
        let key = format!("desc:{fingerprint}");
        match self.db.get(key.as_bytes())? {
            Some(data) => {
                let record =
                    serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt {
                        path: self.path.display().to_string(),
                        reason: format!("record for {fingerprint}: {e}"),
                    })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Number of descriptor records in the store.
    pub fn len(&self) -> Result<usize> {
        let prefix = b"desc:";
        let mut count = 0usize;
        for item in self.db.prefix_iterator(prefix) {
            let (key, _) = item?;
            if key.starts_with(prefix) {
                count += 1;
            } else {
                break;
            }
        }
        Ok(count)
    }

    /// True when the store holds no descriptor records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Filesystem path of the store.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
