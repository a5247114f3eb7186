use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::ActionError;
use crate::config::SweepMode;

/// Why a recording was left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Status is not in the actionable set (e.g., still processing).
    NotActionable { status: String },
    /// Created after the cutoff date.
    TooRecent { date_created: DateTime<Utc> },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotActionable { status } => {
                write!(f, "status '{status}' is not actionable")
            }
            SkipReason::TooRecent { date_created } => {
                write!(f, "created {date_created} is after the cutoff")
            }
        }
    }
}

/// Result of one record action. Failures are values, never panics or
/// errors crossing the action boundary.
#[derive(Debug)]
pub enum ActionOutcome {
    Completed { recording_sid: String },
    Skipped { recording_sid: String, reason: SkipReason },
    Failed { recording_sid: String, error: ActionError },
}

impl ActionOutcome {
    /// Completed and skipped both count as success.
    pub fn is_success(&self) -> bool {
        !self.is_failure()
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }

    /// Label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionOutcome::Completed { .. } => "completed",
            ActionOutcome::Skipped { .. } => "skipped",
            ActionOutcome::Failed { .. } => "failed",
        }
    }
}

/// Why a sweep stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// The listing had no next page.
    CursorExhausted,
    /// The record ceiling was reached.
    CeilingReached,
    /// Accumulated failures used up the failure budget.
    BudgetExceeded,
}

impl TerminalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalReason::CursorExhausted => "cursor_exhausted",
            TerminalReason::CeilingReached => "ceiling_reached",
            TerminalReason::BudgetExceeded => "budget_exceeded",
        }
    }
}

impl std::fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed record and its cause, kept for the sweep report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub recording_sid: String,
    pub cause: String,
}

/// Aggregate result of one sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    /// Teardown applied.
    pub mode: SweepMode,
    /// Whether mutations were suppressed.
    pub dry_run: bool,
    /// Records created on or before this date were eligible.
    pub cutoff: NaiveDate,
    /// Listing pages processed.
    pub pages: u32,
    /// Records observed across all pages.
    pub observed: u64,
    /// Records acted on successfully.
    pub completed: u64,
    /// Records left alone.
    pub skipped: u64,
    /// Records whose action failed.
    pub failures: u64,
    /// Cause of each failure.
    pub failed_records: Vec<RecordFailure>,
    /// Why the sweep stopped.
    pub terminal_reason: TerminalReason,
    /// Wall-clock duration of the sweep in milliseconds.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_is_success() {
        let outcome = ActionOutcome::Skipped {
            recording_sid: "RE1".into(),
            reason: SkipReason::NotActionable {
                status: "processing".into(),
            },
        };
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
        assert_eq!(outcome.kind(), "skipped");
    }

    #[test]
    fn test_failed_is_failure() {
        let outcome = ActionOutcome::Failed {
            recording_sid: "RE2".into(),
            error: ActionError::FetchPayload(crate::sweep::ApiError::Status {
                method: "GET",
                url: "https://api.example.com/x".into(),
                status: 500,
                body: String::new(),
            }),
        };
        assert!(outcome.is_failure());
        assert_eq!(outcome.kind(), "failed");
    }

    #[test]
    fn test_terminal_reason_serializes_snake_case() {
        let json = serde_json::to_string(&TerminalReason::BudgetExceeded).unwrap();
        assert_eq!(json, "\"budget_exceeded\"");
        assert_eq!(TerminalReason::CeilingReached.to_string(), "ceiling_reached");
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::NotActionable {
            status: "in-progress".into(),
        };
        assert_eq!(reason.to_string(), "status 'in-progress' is not actionable");
    }
}
