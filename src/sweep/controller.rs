//! Pagination and termination.
//!
//! Pages are fetched strictly one after another. Each page's recordings are
//! fanned out through the throttle in listing order, all outcomes are
//! collected, and only then is the decision taken to fetch the next page.

use std::{sync::Arc, time::Instant};

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use tracing::{info, instrument};

use super::{
    ActionError, ActionOutcome, ArchiveHook, FailureLedger, RecordAction, RecordHooks,
    RecordingSource, SweepError, SweepResult, TerminalReason, throttle,
};
use crate::{
    config::{SweepConfig, SweepMode, SweeperConfig},
    models::Recording,
    observability::metrics,
    services::{RecordingsClient, create_archive_storage},
};

/// Drives one sweep over a recording source.
pub struct Sweeper {
    source: Arc<dyn RecordingSource>,
    action: RecordAction,
    config: SweepConfig,
}

impl Sweeper {
    /// Build a sweeper from parts. Fails if the sweep settings are invalid.
    pub fn new(
        source: Arc<dyn RecordingSource>,
        action: RecordAction,
        config: SweepConfig,
    ) -> Result<Self, SweepError> {
        config.validate().map_err(SweepError::Config)?;
        Ok(Self {
            source,
            action,
            config,
        })
    }

    /// Build a sweeper wired to the HTTP recordings API and, where the mode
    /// needs it, archive storage.
    pub async fn from_config(config: &SweeperConfig) -> Result<Self, SweepError> {
        config
            .validate()
            .map_err(|e| SweepError::Config(e.to_string()))?;

        let client = RecordingsClient::new(&config.api)
            .map_err(|e| SweepError::Config(format!("failed to build API client: {e}")))?;
        let source: Arc<dyn RecordingSource> = Arc::new(client);
        let sweep = config.sweep.clone();

        let action = match sweep.mode {
            SweepMode::Erase => {
                let mut hooks = RecordHooks::default();
                if sweep.archive_before_erase {
                    let storage = create_archive_storage(&config.storage).await?;
                    hooks = hooks.with_pre(Arc::new(ArchiveHook::new(
                        storage,
                        config.api.payload_format.clone(),
                    )));
                }
                RecordAction::erase(source.clone(), sweep.clone(), hooks)
            }
            SweepMode::Archive => {
                let storage = create_archive_storage(&config.storage).await?;
                RecordAction::archive(
                    source.clone(),
                    sweep.clone(),
                    storage,
                    config.api.payload_format.clone(),
                )
            }
        };

        Self::new(source, action, sweep)
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweep everything older than the retention window as of now.
    pub async fn run(&self) -> Result<SweepResult, SweepError> {
        self.sweep(self.config.cutoff_date(Utc::now())).await
    }

    /// Sweep recordings created on or before `cutoff`.
    ///
    /// The cutoff is fixed for the whole sweep. Only a failed listing fetch
    /// aborts the sweep; per-record failures are counted against the budget.
    #[instrument(
        skip(self),
        fields(
            mode = %self.action.mode(),
            dry_run = self.config.dry_run,
            concurrency = self.config.concurrency_limit,
        )
    )]
    pub async fn sweep(&self, cutoff: NaiveDate) -> Result<SweepResult, SweepError> {
        let result = self.sweep_pages(cutoff).await;
        match &result {
            Ok(summary) => metrics::record_run(summary.terminal_reason.as_str()),
            Err(_) => metrics::record_run("fatal"),
        }
        result
    }

    async fn sweep_pages(&self, cutoff: NaiveDate) -> Result<SweepResult, SweepError> {
        let started = Instant::now();
        info!(
            %cutoff,
            page_size = self.config.page_size,
            record_ceiling = self.config.record_ceiling,
            failure_budget = self.config.failure_budget,
            "Starting sweep"
        );

        let action = &self.action;
        let throttled = throttle(
            move |recording: Recording| async move { action.perform(&recording, cutoff).await },
            self.config.concurrency_limit,
        )?;

        let mut ledger = FailureLedger::new();
        let mut page = self
            .source
            .first_page(cutoff, self.config.page_size)
            .await
            .map_err(|source| SweepError::Listing { page: 0, source })?;

        let terminal_reason = loop {
            let cursor = page.next_cursor().map(str::to_string);
            let page_number = ledger.pages();

            let calls = page.recordings.into_iter().map(|rec| throttled.call(rec));
            let mut outcomes = join_all(calls)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            // Undecodable entries are observed and count against the budget
            outcomes.extend(page.malformed.into_iter().map(|entry| ActionOutcome::Failed {
                recording_sid: entry.sid.unwrap_or_else(|| "<unknown>".to_string()),
                error: ActionError::Malformed(entry.error),
            }));
            ledger.record_page(page_number, &outcomes);

            if self.config.budget_exceeded(ledger.failures()) {
                break TerminalReason::BudgetExceeded;
            }
            if self.config.ceiling_reached(ledger.observed()) {
                break TerminalReason::CeilingReached;
            }
            let Some(cursor) = cursor else {
                break TerminalReason::CursorExhausted;
            };

            page = self
                .source
                .next_page(&cursor)
                .await
                .map_err(|source| SweepError::Listing {
                    page: ledger.pages(),
                    source,
                })?;
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            %terminal_reason,
            pages = ledger.pages(),
            observed = ledger.observed(),
            completed = ledger.completed(),
            skipped = ledger.skipped(),
            failures = ledger.failures(),
            duration_ms,
            "Sweep finished"
        );

        Ok(SweepResult {
            mode: self.action.mode(),
            dry_run: self.config.dry_run,
            cutoff,
            pages: ledger.pages(),
            observed: ledger.observed(),
            completed: ledger.completed(),
            skipped: ledger.skipped(),
            failures: ledger.failures(),
            terminal_reason,
            duration_ms,
            failed_records: ledger.into_failed_records(),
        })
    }
}
