//! CLI parse: clap types for the collector. No behavior; definitions only.

use crate::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Status collector - aggregates claim status into a version-controlled registry
#[derive(Parser)]
#[command(name = "status-collector")]
#[command(about = "Collects claim status from many clusters and proposes registry updates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (default: ./collector.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the ingestion API and the reconciler
    ///
    /// The reconcile period comes from COLLECTOR_RECONCILE_INTERVAL (or
    /// `reconciler.interval_secs`): whole seconds such as 300, 90s, 5m or 1m30s.
    Serve,
    /// Push a single status report to a running collector
    Report {
        /// Collector base URL, e.g. http://collector:8095
        #[arg(long)]
        collector_url: String,
        /// Cluster the claim lives in
        #[arg(long)]
        cluster: String,
        /// Claim namespace
        #[arg(long)]
        namespace: String,
        /// Claim name
        #[arg(long)]
        name: String,
        /// Status message to report
        #[arg(long)]
        status: String,
    },
    /// Parse a local registry document and summarize it
    CheckRegistry {
        /// Path to the registry YAML file
        file: PathBuf,
    },
    /// Print the effective configuration (token redacted)
    Config,
    /// Print version information
    Version,
}
