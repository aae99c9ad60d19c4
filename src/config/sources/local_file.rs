//! Local config file source: an explicit `--config` file, or ./collector.toml.

use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCAL_CONFIG: &str = "collector.toml";

/// Add the local config file. An explicitly requested file must exist.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    explicit: Option<&Path>,
) -> ConfigBuilder<DefaultState> {
    match explicit {
        Some(path) => builder.add_source(File::from(path.to_path_buf()).required(true)),
        None => builder.add_source(File::from(PathBuf::from(DEFAULT_LOCAL_CONFIG)).required(false)),
    }
}
