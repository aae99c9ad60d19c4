//! Status Store
//!
//! Concurrent, in-memory collection of the latest status report per `(cluster, claim_ref)`.
//! Tracks whether anything was written since the last successful flush to the registry.
//!
//! All state sits behind a single reader/writer lock: concurrent readers, one writer at a
//! time. The store is volatile; nothing survives a restart.

mod entry;

pub use entry::{StatusEntry, StoreKey};

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<StoreKey, StatusEntry>,
    dirty: bool,
    /// Bumped on every put
    generation: u64,
}

/// Entries captured together with the store generation they reflect
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub entries: Vec<StatusEntry>,
    pub generation: u64,
}

/// Latest-per-key status reports plus a dirty flag.
///
/// `dirty` is true iff at least one [`put`](Self::put) happened since creation or the
/// last [`mark_flushed`](Self::mark_flushed). Flushing never removes entries, so a failed
/// or suppressed proposal can always be rebuilt from the full set.
#[derive(Debug, Default)]
pub struct StatusStore {
    state: RwLock<StoreState>,
}

impl StatusStore {
    /// Create an empty, clean store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `(cluster, claim_ref)` and mark the store dirty.
    ///
    /// The last writer to take the lock wins, regardless of report timestamps.
    pub fn put(&self, cluster: &str, claim_ref: &str, status: &str) {
        let entry = StatusEntry {
            cluster: cluster.to_string(),
            claim_ref: claim_ref.to_string(),
            status_message: status.to_string(),
            received_at: Utc::now(),
        };

        let mut state = self.state.write();
        state.entries.insert(entry.key(), entry);
        state.dirty = true;
        state.generation += 1;
    }

    pub fn get(&self, cluster: &str, claim_ref: &str) -> Option<StatusEntry> {
        self.state
            .read()
            .entries
            .get(&StoreKey::new(cluster, claim_ref))
            .cloned()
    }

    /// Snapshot of every entry. Order is unspecified.
    pub fn get_all(&self) -> Vec<StatusEntry> {
        self.state.read().entries.values().cloned().collect()
    }

    /// Snapshot of every entry plus the generation it was taken at.
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read();
        StoreSnapshot {
            entries: state.entries.values().cloned().collect(),
            generation: state.generation,
        }
    }

    /// Snapshot of the entries reported for one cluster.
    pub fn get_cluster(&self, cluster: &str) -> Vec<StatusEntry> {
        self.state
            .read()
            .entries
            .values()
            .filter(|entry| entry.cluster == cluster)
            .cloned()
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Clear the dirty flag. Entries are kept.
    pub fn mark_flushed(&self) {
        self.state.write().dirty = false;
    }

    /// Clear the dirty flag only if nothing was put since `generation` was observed.
    ///
    /// Returns whether the store is now clean.
    pub fn mark_flushed_if_unchanged(&self, generation: u64) -> bool {
        let mut state = self.state.write();
        if state.generation == generation {
            state.dirty = false;
        }
        !state.dirty
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
