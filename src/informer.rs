//! Watcher-side helpers
//!
//! What a per-cluster watcher needs to feed the collector: the policy that turns a
//! claim's condition list into a status string, and a client that posts the resulting
//! report to the ingestion API. Discovering claim changes in a cluster is left to the
//! watcher itself.

pub mod reporter;
pub mod status;

pub use reporter::{StatusReport, StatusReporter};
pub use status::{claim_ref, extract_claim_status};
