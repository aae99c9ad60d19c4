//! Configuration System
//!
//! Layered configuration for the collector. Precedence (lowest to highest):
//! built-in defaults, the global config file, the local or explicit config file,
//! `COLLECTOR__SECTION__KEY` environment variables, and finally the flat deployment
//! variables (`GITHUB_TOKEN`, `REGISTRY_REPO_OWNER`, ...).

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

mod merge_policy;
mod sources;

pub use sources::environment::parse_interval_secs;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ingestion API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8095,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reconciliation loop settings and the wording of generated proposals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Seconds between ticks
    pub interval_secs: u64,
    /// Proposal branches are named `<branch_prefix>-<unix seconds>`
    pub branch_prefix: String,
    pub commit_message: String,
    pub proposal_title: String,
    pub proposal_body: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            branch_prefix: "status-update".to_string(),
            commit_message: "chore: update claim statuses".to_string(),
            proposal_title: "chore: update claim statuses".to_string(),
            proposal_body: "Automated status update from status-collector.".to_string(),
        }
    }
}

impl ReconcilerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Where the registry document lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub owner: String,
    pub repo: String,
    /// Path of the registry document inside the repository
    pub file_path: String,
    pub base_branch: String,
    pub token: String,
    pub api_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            file_path: String::new(),
            base_branch: "main".to_string(),
            token: String::new(),
            api_url: crate::remote::github::DEFAULT_API_URL.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Check everything `serve` needs. Reports every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let required = [
            ("registry.owner (REGISTRY_REPO_OWNER)", &self.registry.owner),
            ("registry.repo (REGISTRY_REPO_NAME)", &self.registry.repo),
            ("registry.file_path (REGISTRY_FILE_PATH)", &self.registry.file_path),
            ("registry.token (GITHUB_TOKEN)", &self.registry.token),
            ("registry.base_branch (REGISTRY_BASE_BRANCH)", &self.registry.base_branch),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                errors.push(format!("{} is required", name));
            }
        }

        if self.reconciler.interval_secs == 0 {
            errors.push("reconciler.interval_secs must be greater than zero".to_string());
        }
        if self.reconciler.branch_prefix.trim().is_empty() {
            errors.push("reconciler.branch_prefix cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.registry.token.is_empty() {
            config.registry.token = "********".to_string();
        }
        config
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Other(e.to_string()))
    }
}

/// Loads [`CollectorConfig`] from every source.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load using the process environment.
    pub fn load(config_path: Option<&Path>) -> Result<CollectorConfig, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(config_path, &vars)
    }

    /// Load using an explicit set of environment variables.
    pub fn load_with_env(
        config_path: Option<&Path>,
        vars: &HashMap<String, String>,
    ) -> Result<CollectorConfig, ConfigError> {
        let lookup = |key: &str| vars.get(key).cloned();

        let builder = merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder, &lookup);
        let builder = sources::local_file::add_to_builder(builder, config_path);
        let builder = sources::environment::add_nested(builder, vars);
        let builder = sources::environment::add_flat(builder, &lookup)?;

        let config: CollectorConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load defaults plus a single file, ignoring every other source.
    pub fn load_from_file(path: &Path) -> Result<CollectorConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = sources::local_file::add_to_builder(builder, Some(path));
        Ok(builder.build()?.try_deserialize()?)
    }
}
