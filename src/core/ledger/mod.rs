//! Asset Ledger Module
//!
//! Durable, concurrency-safe store of `AssetRecord`s keyed by asset id.
//!
//! Write discipline:
//! - `update` is linearizable per id: the mutator runs against a snapshot
//!   outside any lock, and the result is committed only if no other write
//!   landed on that record in between (versioned compare-and-swap). The
//!   retry loop is bounded; exhaustion surfaces `Conflict`.
//! - Persistence is atomic-on-write: the whole document is serialized and
//!   swapped into place via temp-file-then-rename under a save mutex, so
//!   a crash mid-write never yields a truncated store.

mod models;
pub use models::*;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tokio::sync::Mutex;
use tracing::debug;

use crate::core::{fs, AssetId, CoreError, CoreResult};

/// Bounded internal retries for contended `update` calls.
///
/// A retry only happens when another writer committed in between, so a
/// single update can exhaust this bound only behind that many foreign
/// commits.
pub const MAX_WRITE_RETRIES: usize = 64;

#[derive(Clone, Debug)]
struct VersionedRecord {
    record: AssetRecord,
    version: u64,
}

/// Durable keyed store of asset records.
pub struct AssetLedger {
    path: PathBuf,
    records: RwLock<HashMap<AssetId, VersionedRecord>>,
    /// Serializes file replacements so snapshots land in commit order.
    save_lock: Mutex<()>,
}

impl AssetLedger {
    /// Opens the ledger at `path`, loading the existing document if any.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let mut records = HashMap::new();

        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let document: BTreeMap<AssetId, AssetRecord> = serde_json::from_str(&raw)?;
            for (id, record) in document {
                records.insert(
                    id,
                    VersionedRecord {
                        record,
                        version: 0,
                    },
                );
            }
            debug!(count = records.len(), path = %path.display(), "ledger loaded");
        }

        Ok(Self {
            path: path.to_path_buf(),
            records: RwLock::new(records),
            save_lock: Mutex::new(()),
        })
    }

    /// Fetches a record by id.
    pub fn get(&self, id: &str) -> Option<AssetRecord> {
        self.records
            .read()
            .expect("ledger lock poisoned")
            .get(id)
            .map(|entry| entry.record.clone())
    }

    /// Returns all records, unordered.
    pub fn list(&self) -> Vec<AssetRecord> {
        self.records
            .read()
            .expect("ledger lock poisoned")
            .values()
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Inserts a new record. Fails with `Conflict` if the id exists.
    pub async fn create(&self, record: AssetRecord) -> CoreResult<()> {
        {
            let mut map = self.records.write().expect("ledger lock poisoned");
            if map.contains_key(&record.id) {
                return Err(CoreError::Conflict(format!(
                    "asset id already exists: {}",
                    record.id
                )));
            }
            map.insert(
                record.id.clone(),
                VersionedRecord {
                    record,
                    version: 0,
                },
            );
        }
        self.persist().await
    }

    /// Applies `mutator` to the record atomically and returns the result.
    ///
    /// Mutators for the same id are applied as if serialized even when
    /// issued concurrently; mutators for distinct ids interleave freely.
    /// The mutator may run more than once under contention, so it must be
    /// a pure function of the record it receives.
    pub async fn update<F>(&self, id: &str, mut mutator: F) -> CoreResult<AssetRecord>
    where
        F: FnMut(&mut AssetRecord),
    {
        for attempt in 0..MAX_WRITE_RETRIES {
            let (mut working, seen_version) = {
                let map = self.records.read().expect("ledger lock poisoned");
                let entry = map
                    .get(id)
                    .ok_or_else(|| CoreError::NotFound(format!("asset not found: {id}")))?;
                (entry.record.clone(), entry.version)
            };

            mutator(&mut working);

            let committed = {
                let mut map = self.records.write().expect("ledger lock poisoned");
                match map.get_mut(id) {
                    Some(entry) if entry.version == seen_version => {
                        entry.record = working.clone();
                        entry.version += 1;
                        true
                    }
                    Some(_) => false,
                    None => {
                        return Err(CoreError::NotFound(format!("asset not found: {id}")));
                    }
                }
            };

            if committed {
                if attempt > 0 {
                    debug!(id, attempt, "ledger update committed after retry");
                }
                self.persist().await?;
                return Ok(working);
            }
        }

        Err(CoreError::Conflict(format!(
            "update for asset {id} lost {MAX_WRITE_RETRIES} write races"
        )))
    }

    /// Writes the whole document with the atomic replace pattern.
    async fn persist(&self) -> CoreResult<()> {
        let _guard = self.save_lock.lock().await;
        let snapshot: BTreeMap<AssetId, AssetRecord> = {
            let map = self.records.read().expect("ledger lock poisoned");
            map.iter()
                .map(|(id, entry)| (id.clone(), entry.record.clone()))
                .collect()
        };
        fs::atomic_write_json_pretty(&self.path, &snapshot)
    }
}
