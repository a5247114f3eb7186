use tracing::{info, warn};

use super::{ActionOutcome, RecordFailure};
use crate::observability::metrics;

/// Counts for a single page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTally {
    pub page: u32,
    pub records: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failures: u64,
}

/// Running totals for a sweep.
///
/// Only ever adds: counts are monotonic for the life of a sweep. Enforcing the
/// failure budget is left to the caller.
#[derive(Debug, Default)]
pub struct FailureLedger {
    pages: u32,
    observed: u64,
    completed: u64,
    skipped: u64,
    failures: u64,
    failed_records: Vec<RecordFailure>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one page's outcomes into the totals and log its failures.
    pub fn record_page(&mut self, page: u32, outcomes: &[ActionOutcome]) -> PageTally {
        let mut tally = PageTally {
            page,
            records: outcomes.len() as u64,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                ActionOutcome::Completed { .. } => tally.completed += 1,
                ActionOutcome::Skipped { .. } => tally.skipped += 1,
                ActionOutcome::Failed {
                    recording_sid,
                    error,
                } => {
                    tally.failures += 1;
                    warn!(page, %recording_sid, %error, "Record action failed");
                    self.failed_records.push(RecordFailure {
                        recording_sid: recording_sid.clone(),
                        cause: error.to_string(),
                    });
                }
            }
        }

        self.pages += 1;
        self.observed += tally.records;
        self.completed += tally.completed;
        self.skipped += tally.skipped;
        self.failures += tally.failures;
        metrics::record_page();

        if tally.failures > 0 {
            warn!(
                page,
                failures = tally.failures,
                total_failures = self.failures,
                "Page finished with failures"
            );
        }
        info!(
            page,
            records = tally.records,
            completed = tally.completed,
            skipped = tally.skipped,
            failures = tally.failures,
            observed = self.observed,
            "Page processed"
        );

        tally
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn failed_records(&self) -> &[RecordFailure] {
        &self.failed_records
    }

    pub fn into_failed_records(self) -> Vec<RecordFailure> {
        self.failed_records
    }
}
