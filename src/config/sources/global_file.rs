//! Global config file source: $XDG_CONFIG_HOME/status-collector/config.toml or
//! ~/.config/status-collector/config.toml

use super::EnvLookup;
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::PathBuf;
use tracing::debug;

/// Path to the global config file.
pub fn global_config_path(env: EnvLookup<'_>) -> Option<PathBuf> {
    let base = env("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("status-collector").join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    env: EnvLookup<'_>,
) -> ConfigBuilder<DefaultState> {
    match global_config_path(env) {
        Some(path) if path.exists() => {
            debug!(config_path = %path.display(), "Loading global configuration");
            builder.add_source(File::from(path).required(false))
        }
        _ => builder,
    }
}
