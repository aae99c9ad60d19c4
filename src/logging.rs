//! Logging System
//!
//! Structured logging using the `tracing` crate. Level, format and destination come from
//! the configuration file, CLI flags, or the `COLLECTOR_LOG*` environment variables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Full filter directive, e.g. `status_collector=debug,axum=warn`
pub const LOG_FILTER_ENV: &str = "COLLECTOR_LOG";
pub const LOG_FORMAT_ENV: &str = "COLLECTOR_LOG_FORMAT";
pub const LOG_OUTPUT_ENV: &str = "COLLECTOR_LOG_OUTPUT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Other(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// Where log lines go. Container deployments collect stdout; `stderr` keeps command
/// output on stdout clean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

impl FromStr for LogOutput {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            other => Err(ConfigError::Other(format!(
                "Invalid log output: {} (must be 'stdout' or 'stderr')",
                other
            ))),
        }
    }
}

impl LogOutput {
    fn writer(self) -> BoxMakeWriter {
        match self {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// ANSI colors in text output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `reqwest = "warn"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            color: true,
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Apply `COLLECTOR_LOG_FORMAT` and `COLLECTOR_LOG_OUTPUT` on top of this config.
    fn with_env_overrides(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        if let Some(format) = env(LOG_FORMAT_ENV).filter(|v| !v.is_empty()) {
            config.format = format.parse()?;
        }
        if let Some(output) = env(LOG_OUTPUT_ENV).filter(|v| !v.is_empty()) {
            config.output = output.parse()?;
        }
        Ok(config)
    }

    /// Filter from the level plus per-module directives.
    fn filter(&self) -> Result<EnvFilter, ConfigError> {
        if self.level == "off" {
            return Ok(EnvFilter::new("off"));
        }

        let mut filter = EnvFilter::new(&self.level);
        for (module, level) in &self.modules {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| ConfigError::Other(format!("Invalid log directive: {}", e)))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }
}

/// Install the global subscriber.
///
/// `COLLECTOR_LOG` replaces the configured level and module directives entirely;
/// `COLLECTOR_LOG_FORMAT` and `COLLECTOR_LOG_OUTPUT` override their config fields.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    let config = config
        .cloned()
        .unwrap_or_default()
        .with_env_overrides(|key| std::env::var(key).ok())?;

    let filter = match EnvFilter::try_from_env(LOG_FILTER_ENV) {
        Ok(filter) => filter,
        Err(_) => config.filter()?,
    };

    let writer = config.output.writer();
    let (json, text) = match config.format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            ),
            None,
        ),
        LogFormat::Text => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color)
                    .with_writer(writer),
            ),
        ),
    };

    Registry::default()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| ConfigError::Other(format!("Failed to initialize logging: {}", e)))
}
