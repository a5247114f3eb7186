//! Sweep configuration.
//!
//! Controls which recordings a sweep selects, how many it acts on at once,
//! and when it stops early.
//!
//! # Example
//!
//! ```toml
//! [sweep]
//! mode = "erase"
//! retention_days = 30
//! page_size = 100
//! concurrency_limit = 20
//! record_ceiling = 1000
//! failure_budget = 50
//! fetch_payload = true
//! delete_secondary = false
//! archive_before_erase = true
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Which teardown a sweep applies to each eligible recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Delete the recording (and optionally its call) from the remote API.
    Erase,

    /// Copy the recording audio to durable storage. The remote API is not modified.
    #[default]
    Archive,
}

impl SweepMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepMode::Erase => "erase",
            SweepMode::Archive => "archive",
        }
    }
}

impl std::fmt::Display for SweepMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SweepMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "erase" => Ok(SweepMode::Erase),
            "archive" => Ok(SweepMode::Archive),
            other => Err(format!(
                "unknown sweep mode '{other}' (expected 'erase' or 'archive')"
            )),
        }
    }
}

/// Sweep configuration.
///
/// Constructed once per invocation and never mutated while a sweep runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Teardown applied to eligible recordings.
    /// Default: archive
    #[serde(default)]
    pub mode: SweepMode,

    /// Recordings created this many days ago or earlier are eligible.
    /// Values below `min_retention_days` are raised to it.
    /// Default: 30
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Floor applied to `retention_days`.
    /// Default: 7
    #[serde(default = "default_min_retention_days")]
    pub min_retention_days: u32,

    /// Records requested per listing page.
    /// Default: 100
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum number of record actions in flight at once. Must be at least 1.
    /// Default: 20
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Stop once this many records have been observed.
    /// Set to 0 for unlimited.
    /// Default: 1000
    #[serde(default = "default_record_ceiling")]
    pub record_ceiling: u64,

    /// Stop once this many record actions have failed.
    /// Set to 0 for unlimited.
    /// Default: 50
    #[serde(default = "default_failure_budget")]
    pub failure_budget: u64,

    /// Recording statuses that may be acted on. Anything else is skipped.
    /// Default: ["completed"]
    #[serde(default = "default_actionable_statuses")]
    pub actionable_statuses: Vec<String>,

    /// Erase mode: download the recording audio before deleting it.
    /// Archive mode always downloads the audio.
    /// Default: false
    #[serde(default)]
    pub fetch_payload: bool,

    /// Erase mode: also delete the call the recording belongs to.
    /// Default: false
    #[serde(default)]
    pub delete_secondary: bool,

    /// Erase mode: write the audio to archive storage before deleting.
    /// Requires `fetch_payload`.
    /// Default: false
    #[serde(default)]
    pub archive_before_erase: bool,

    /// Log what would be deleted or written without doing it.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            mode: SweepMode::default(),
            retention_days: default_retention_days(),
            min_retention_days: default_min_retention_days(),
            page_size: default_page_size(),
            concurrency_limit: default_concurrency_limit(),
            record_ceiling: default_record_ceiling(),
            failure_budget: default_failure_budget(),
            actionable_statuses: default_actionable_statuses(),
            fetch_payload: false,
            delete_secondary: false,
            archive_before_erase: false,
            dry_run: false,
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

fn default_min_retention_days() -> u32 {
    7
}

fn default_page_size() -> u32 {
    100
}

fn default_concurrency_limit() -> usize {
    20
}

fn default_record_ceiling() -> u64 {
    1000
}

fn default_failure_budget() -> u64 {
    50
}

fn default_actionable_statuses() -> Vec<String> {
    vec!["completed".to_string()]
}

impl SweepConfig {
    /// Validate the sweep settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency_limit == 0 {
            return Err("sweep.concurrency_limit must be at least 1".to_string());
        }
        if self.page_size == 0 {
            return Err("sweep.page_size must be at least 1".to_string());
        }
        if self.actionable_statuses.is_empty() {
            return Err("sweep.actionable_statuses cannot be empty".to_string());
        }
        if self.mode == SweepMode::Erase && self.archive_before_erase && !self.fetch_payload {
            return Err(
                "sweep.archive_before_erase requires sweep.fetch_payload = true".to_string(),
            );
        }
        Ok(())
    }

    /// Retention actually applied, never below `min_retention_days`.
    pub fn effective_retention_days(&self) -> u32 {
        self.retention_days.max(self.min_retention_days)
    }

    /// Cutoff date for a sweep starting at `now`.
    pub fn cutoff_date(&self, now: DateTime<Utc>) -> NaiveDate {
        (now - Duration::days(i64::from(self.effective_retention_days()))).date_naive()
    }

    /// Check if the observed count has hit the record ceiling.
    pub fn ceiling_reached(&self, observed: u64) -> bool {
        self.record_ceiling > 0 && observed >= self.record_ceiling
    }

    /// Check if the failure count has used up the failure budget.
    pub fn budget_exceeded(&self, failures: u64) -> bool {
        self.failure_budget > 0 && failures >= self.failure_budget
    }

    pub fn is_actionable(&self, status: &str) -> bool {
        self.actionable_statuses.iter().any(|s| s == status)
    }

    /// Whether the erase variant needs the recording audio.
    pub fn needs_payload(&self) -> bool {
        match self.mode {
            SweepMode::Archive => true,
            SweepMode::Erase => self.fetch_payload,
        }
    }
}
