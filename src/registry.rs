//! Registry Document
//!
//! In-memory model of the remote registry: a mapping from cluster name to the ordered
//! list of claims tracked for that cluster. Parsing, merging and serialization are pure;
//! the reconciler owns all I/O.
//!
//! Claim order inside a cluster is preserved exactly. Cluster keys are emitted in sorted
//! order so repeated serialization of the same model is byte-stable.

use crate::error::RegistryError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A claim tracked in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub claim_ref: String,
    #[serde(default)]
    pub status_message: String,
    /// RFC 3339 UTC timestamp, empty until the first reconciliation touches the claim
    #[serde(default)]
    pub last_checked_at: String,
}

/// The whole registry document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryFile {
    pub clusters: BTreeMap<String, Vec<ClaimEntry>>,
}

/// Format used for `lastCheckedAt`: second precision, explicit `Z` suffix.
pub fn format_checked_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl RegistryFile {
    /// Parse a registry document.
    ///
    /// Empty, whitespace-only and null documents yield an empty registry.
    pub fn parse(data: &[u8]) -> Result<Self, RegistryError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| RegistryError::Parse(format!("document is not UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let clusters: Option<BTreeMap<String, Vec<ClaimEntry>>> =
            serde_yaml::from_str(text).map_err(|e| RegistryError::Parse(e.to_string()))?;

        Ok(Self {
            clusters: clusters.unwrap_or_default(),
        })
    }

    /// Serialize the registry back to a YAML document.
    pub fn serialize(&self) -> Result<Vec<u8>, RegistryError> {
        serde_yaml::to_string(&self.clusters)
            .map(String::into_bytes)
            .map_err(|e| RegistryError::Serialize(e.to_string()))
    }

    /// Overwrite the status of an existing claim and stamp it with the current time.
    ///
    /// Returns `false` without touching the document when the cluster or the claim is
    /// not tracked.
    pub fn update_claim_status(&mut self, cluster: &str, claim_ref: &str, status: &str) -> bool {
        self.update_claim_status_at(cluster, claim_ref, status, Utc::now())
    }

    /// Same as [`update_claim_status`](Self::update_claim_status) with an explicit check time.
    pub fn update_claim_status_at(
        &mut self,
        cluster: &str,
        claim_ref: &str,
        status: &str,
        checked_at: DateTime<Utc>,
    ) -> bool {
        let Some(claims) = self.clusters.get_mut(cluster) else {
            return false;
        };

        match claims.iter_mut().find(|claim| claim.claim_ref == claim_ref) {
            Some(claim) => {
                claim.status_message = status.to_string();
                claim.last_checked_at = format_checked_at(checked_at);
                true
            }
            None => false,
        }
    }

    /// Look up a claim by cluster and claim reference.
    pub fn claim(&self, cluster: &str, claim_ref: &str) -> Option<&ClaimEntry> {
        self.clusters
            .get(cluster)?
            .iter()
            .find(|claim| claim.claim_ref == claim_ref)
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn claim_count(&self) -> usize {
        self.clusters.values().map(Vec::len).sum()
    }
}
