//! Status Collector: claim status aggregation and registry reconciliation
//!
//! Collects status reports about provisioned claims from many independent cluster
//! watchers and converges them into a version-controlled registry document through
//! batched change proposals.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod informer;
pub mod logging;
pub mod reconciler;
pub mod registry;
pub mod remote;
pub mod store;
