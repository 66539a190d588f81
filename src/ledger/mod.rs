//! Time-windowed record of identifiers that have already been notified.
//!
//! The backing store only offers whole-value reads and writes, so the ledger
//! computes the complete next state in memory and expires stale records on
//! the read path, before anything is written back.

pub mod diff;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::app::Result;
use crate::domain::SeenRecord;
use crate::store::RecordStore;

pub use diff::{diff, Diff};

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

pub struct Ledger {
    store: Arc<dyn RecordStore + Send + Sync>,
    retention: Duration,
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore + Send + Sync>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Read all persisted records and drop those older than the retention window.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<Vec<SeenRecord>> {
        let stored = self.store.read_all().await?;
        let total = stored.len();

        let kept = expire(dedup(stored), now, self.retention);
        tracing::debug!(
            "Loaded {} ledger records ({} dropped as expired or duplicate)",
            kept.len(),
            total - kept.len()
        );

        Ok(kept)
    }

    /// Persist `retained` plus a fresh record stamped `now` for every newly seen id.
    ///
    /// Returns the exact set that was written.
    pub async fn save(
        &self,
        retained: Vec<SeenRecord>,
        newly_seen: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeenRecord>> {
        let records = compose(retained, newly_seen, now);
        self.store.write_all(&records).await?;
        tracing::debug!("Saved {} ledger records", records.len());
        Ok(records)
    }
}

/// Keep records whose age does not exceed `retention`.
pub fn expire(records: Vec<SeenRecord>, now: DateTime<Utc>, retention: Duration) -> Vec<SeenRecord> {
    records
        .into_iter()
        .filter(|r| !r.is_expired(now, retention))
        .collect()
}

/// Collapse records sharing an id, keeping the earliest `first_seen`.
fn dedup(records: Vec<SeenRecord>) -> Vec<SeenRecord> {
    let mut order = Vec::with_capacity(records.len());
    let mut by_id: HashMap<String, DateTime<Utc>> = HashMap::with_capacity(records.len());

    for record in records {
        match by_id.entry(record.id) {
            Entry::Occupied(mut e) => {
                if record.first_seen < *e.get() {
                    e.insert(record.first_seen);
                }
            }
            Entry::Vacant(e) => {
                order.push(e.key().clone());
                e.insert(record.first_seen);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id).map(|ts| SeenRecord::new(id, ts)))
        .collect()
}

/// Build the next ledger state: new records first, then retained ones untouched.
pub fn compose(
    retained: Vec<SeenRecord>,
    newly_seen: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<SeenRecord> {
    let mut ids: Vec<&String> = newly_seen.iter().collect();
    ids.sort();

    let mut records: Vec<SeenRecord> = ids
        .into_iter()
        .filter(|id| !retained.iter().any(|r| &r.id == *id))
        .map(|id| SeenRecord::new(id.clone(), now))
        .collect();
    records.extend(retained);
    records
}
