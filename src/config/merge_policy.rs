//! Merge rules: defaults applied before any file or environment source.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with every default set.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8095)?
        .set_default("reconciler.interval_secs", 300)?
        .set_default("reconciler.branch_prefix", "status-update")?
        .set_default("reconciler.commit_message", "chore: update claim statuses")?
        .set_default("reconciler.proposal_title", "chore: update claim statuses")?
        .set_default(
            "reconciler.proposal_body",
            "Automated status update from status-collector.",
        )?
        .set_default("registry.owner", "")?
        .set_default("registry.repo", "")?
        .set_default("registry.file_path", "")?
        .set_default("registry.base_branch", "main")?
        .set_default("registry.token", "")?
        .set_default("registry.api_url", crate::remote::github::DEFAULT_API_URL)
}
