//! Status entries held by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One status observation for a claim in a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub cluster: String,
    pub claim_ref: String,
    pub status_message: String,
    /// Set by the store on insertion
    pub received_at: DateTime<Utc>,
}

impl StatusEntry {
    pub fn key(&self) -> StoreKey {
        StoreKey::new(&self.cluster, &self.claim_ref)
    }
}

/// Identity of a status entry: `(cluster, claim_ref)`.
///
/// Kept as a pair so `a/b` + `c` never collides with `a` + `b/c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub cluster: String,
    pub claim_ref: String,
}

impl StoreKey {
    pub fn new(cluster: &str, claim_ref: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            claim_ref: claim_ref.to_string(),
        }
    }
}
