//! Environment sources: nested `COLLECTOR__SECTION__KEY` variables, then the flat
//! deployment variables (`GITHUB_TOKEN`, `REGISTRY_REPO_OWNER`, ...).

use super::EnvLookup;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment};
use std::collections::HashMap;

/// Flat variable name and the config key it overrides.
const FLAT_VARIABLES: &[(&str, &str)] = &[
    ("GITHUB_TOKEN", "registry.token"),
    ("REGISTRY_REPO_OWNER", "registry.owner"),
    ("REGISTRY_REPO_NAME", "registry.repo"),
    ("REGISTRY_FILE_PATH", "registry.file_path"),
    ("REGISTRY_BASE_BRANCH", "registry.base_branch"),
    ("GITHUB_API_URL", "registry.api_url"),
    ("COLLECTOR_PORT", "server.port"),
];

/// Add `COLLECTOR__*` variables from `vars`.
pub fn add_nested(
    builder: ConfigBuilder<DefaultState>,
    vars: &HashMap<String, String>,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("COLLECTOR")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(Some(vars.clone())),
    )
}

/// Apply flat deployment variables as overrides. Empty values are ignored.
pub fn add_flat(
    mut builder: ConfigBuilder<DefaultState>,
    env: EnvLookup<'_>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (variable, key) in FLAT_VARIABLES {
        if let Some(value) = env(variable).filter(|v| !v.is_empty()) {
            builder = builder.set_override(*key, value)?;
        }
    }

    if let Some(raw) = env("COLLECTOR_RECONCILE_INTERVAL").filter(|v| !v.is_empty()) {
        let secs = parse_interval_secs(&raw).map_err(|e| {
            ConfigError::Message(format!("invalid COLLECTOR_RECONCILE_INTERVAL: {}", e))
        })?;
        builder = builder.set_override("reconciler.interval_secs", secs)?;
    }

    Ok(builder)
}

/// Parse an interval into whole seconds.
///
/// Accepts a bare number of seconds (`90`) or Go-style unit segments (`90s`, `5m`,
/// `1m30s`, `1h15m`, `2000ms`). The total must be a whole number of seconds.
pub fn parse_interval_secs(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    let invalid = || {
        format!(
            "'{}' is not a duration (expected e.g. 90, 90s, 5m, 1m30s, 1h)",
            raw
        )
    };
    if raw.is_empty() {
        return Err(invalid());
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().map_err(|_| format!("'{}' is too large", raw));
    }

    let mut total_ms: u64 = 0;
    let mut rest = raw;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let unit_end = rest[digits_end..]
            .find(|c: char| c.is_ascii_digit())
            .map_or(rest.len(), |i| digits_end + i);
        let value: u64 = rest[..digits_end].parse().map_err(|_| invalid())?;
        let unit_ms = match &rest[digits_end..unit_end] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            _ => return Err(invalid()),
        };
        total_ms = value
            .checked_mul(unit_ms)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| format!("'{}' is too large", raw))?;
        rest = &rest[unit_end..];
    }

    if total_ms % 1_000 != 0 {
        return Err(format!("'{}' is not a whole number of seconds", raw));
    }
    Ok(total_ms / 1_000)
}
