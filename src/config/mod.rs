//! Configuration module for the voicemail sweeper.
//!
//! The sweeper is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [sweep]
//! mode = "archive"
//! retention_days = 30
//!
//! [api]
//! account_id = "${ACCOUNT_ID}"
//! auth_token = "${AUTH_TOKEN}"
//!
//! [storage.s3]
//! bucket = "voicemail-archives"
//! ```

mod api;
mod http_client;
mod observability;
mod storage;
mod sweep;

use std::path::Path;

pub use api::*;
pub use http_client::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use storage::*;
pub use sweep::*;

/// Root configuration for the sweeper.
///
/// Every section is optional except the API credentials, which `validate`
/// requires before any network activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct SweeperConfig {
    /// Selection, concurrency and termination settings.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Recordings API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Archive storage for archive mode and archive-before-erase.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl SweeperConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Pre-check: detect feature-gated config values before typed deserialization
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: SweeperConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sweep.validate().map_err(ConfigError::Validation)?;
        self.api.validate().map_err(ConfigError::Validation)?;
        if self.uses_archive_storage() {
            self.storage.validate().map_err(ConfigError::Validation)?;
        }
        Ok(())
    }

    /// Whether this configuration writes to archive storage.
    pub fn uses_archive_storage(&self) -> bool {
        match self.sweep.mode {
            SweepMode::Archive => true,
            SweepMode::Erase => self.sweep.archive_before_erase,
        }
    }

    /// Generate the JSON schema for the configuration file.
    #[cfg(feature = "json-schema")]
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SweeperConfig)
    }

    /// Generate the JSON schema as a pretty-printed JSON string.
    #[cfg(feature = "json-schema")]
    pub fn json_schema_string() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::json_schema())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Check for feature-gated configuration values before typed deserialization.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let mut issues: Vec<(String, &str)> = Vec::new();

    let mode = raw
        .get("sweep")
        .and_then(|v| v.get("mode"))
        .and_then(|v| v.as_str())
        .unwrap_or("archive");
    let archive_before_erase = raw
        .get("sweep")
        .and_then(|v| v.get("archive_before_erase"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let backend = raw
        .get("storage")
        .and_then(|v| v.get("backend"))
        .and_then(|v| v.as_str())
        .unwrap_or("s3");

    if (mode == "archive" || archive_before_erase) && backend == "s3" {
        check_s3_feature(&mut issues);
    }

    if raw
        .get("observability")
        .and_then(|v| v.get("metrics"))
        .and_then(|v| v.get("enabled"))
        .and_then(|v| v.as_bool())
        == Some(true)
    {
        check_metrics_feature(&mut issues);
    }

    if issues.is_empty() {
        return Ok(());
    }

    let details = issues
        .iter()
        .map(|(msg, _)| msg.as_str())
        .collect::<Vec<_>>()
        .join("\n  - ");
    let features = issues
        .iter()
        .map(|(_, feat)| *feat)
        .collect::<Vec<_>>()
        .join(",");

    Err(ConfigError::Validation(format!(
        "Configuration requires features not compiled in this build:\n  \
         - {details}\n\n\
         Rebuild with: cargo build --features {features}\n\
         Or use the 'full' profile: cargo build --features full"
    )))
}

fn check_s3_feature(_issues: &mut Vec<(String, &str)>) {
    #[cfg(not(feature = "s3-storage"))]
    _issues.push((
        "archiving to storage backend 's3' requires the 's3-storage' feature".into(),
        "s3-storage",
    ));
}

fn check_metrics_feature(_issues: &mut Vec<(String, &str)>) {
    #[cfg(not(feature = "prometheus"))]
    _issues.push((
        "observability.metrics.enabled requires the 'prometheus' feature".into(),
        "prometheus",
    ));
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("invalid expansion pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        // Only expand variables that appear before any comment
        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
