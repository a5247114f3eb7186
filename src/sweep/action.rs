//! Per-record teardown.
//!
//! Both variants run the same shape: skip-check, fetch, optional hook, mutate
//! remote state, optional hook. Every step either advances or ends the action
//! with a failure carrying the cause. Nothing is retried.

use std::{sync::Arc, time::Instant};

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::{Instrument, debug, info, info_span, warn};

use super::{ActionError, ActionOutcome, RecordHooks, RecordingSource, SkipReason};
use crate::{
    config::{SweepConfig, SweepMode},
    models::{ParentCall, Recording},
    observability::metrics,
    services::{ArchiveStorage, archive_key},
};

enum Teardown {
    Erase {
        hooks: RecordHooks,
    },
    Archive {
        storage: Arc<dyn ArchiveStorage>,
        extension: String,
    },
}

/// The action applied to each eligible recording.
pub struct RecordAction {
    source: Arc<dyn RecordingSource>,
    config: SweepConfig,
    teardown: Teardown,
}

impl RecordAction {
    /// Erase variant: delete the recording (and optionally its call).
    pub fn erase(
        source: Arc<dyn RecordingSource>,
        config: SweepConfig,
        hooks: RecordHooks,
    ) -> Self {
        Self {
            source,
            config,
            teardown: Teardown::Erase { hooks },
        }
    }

    /// Archive variant: copy the audio to durable storage. The source is only read.
    pub fn archive(
        source: Arc<dyn RecordingSource>,
        config: SweepConfig,
        storage: Arc<dyn ArchiveStorage>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            source,
            config,
            teardown: Teardown::Archive {
                storage,
                extension: extension.into(),
            },
        }
    }

    pub fn mode(&self) -> SweepMode {
        match self.teardown {
            Teardown::Erase { .. } => SweepMode::Erase,
            Teardown::Archive { .. } => SweepMode::Archive,
        }
    }

    /// Run the action for one recording. Never fails: errors come back as
    /// [`ActionOutcome::Failed`].
    pub async fn perform(&self, recording: &Recording, cutoff: NaiveDate) -> ActionOutcome {
        let span = info_span!(
            "record_action",
            recording_sid = %recording.sid,
            call_sid = %recording.call_sid,
            mode = %self.mode(),
        );
        let started = Instant::now();

        let outcome = async {
            if let Some(reason) = self.skip_reason(recording, cutoff) {
                info!(%reason, "Skipping recording");
                return ActionOutcome::Skipped {
                    recording_sid: recording.sid.clone(),
                    reason,
                };
            }

            let result = match &self.teardown {
                Teardown::Erase { hooks } => self.erase_one(recording, hooks).await,
                Teardown::Archive { storage, extension } => {
                    self.archive_one(recording, storage.as_ref(), extension).await
                }
            };

            match result {
                Ok(()) => ActionOutcome::Completed {
                    recording_sid: recording.sid.clone(),
                },
                Err(error) => {
                    debug!(%error, "Record action failed");
                    ActionOutcome::Failed {
                        recording_sid: recording.sid.clone(),
                        error,
                    }
                }
            }
        }
        .instrument(span)
        .await;

        metrics::record_action(
            self.mode().as_str(),
            outcome.kind(),
            started.elapsed().as_secs_f64(),
        );
        outcome
    }

    fn skip_reason(&self, recording: &Recording, cutoff: NaiveDate) -> Option<SkipReason> {
        if !self.config.is_actionable(&recording.status) {
            return Some(SkipReason::NotActionable {
                status: recording.status.clone(),
            });
        }
        // The listing filters by date, but a source may not honour it exactly
        if !recording.created_on_or_before(cutoff) {
            return Some(SkipReason::TooRecent {
                date_created: recording.date_created,
            });
        }
        None
    }

    async fn fetch_call(&self, recording: &Recording) -> Result<ParentCall, ActionError> {
        self.source
            .fetch_call(recording)
            .await
            .map_err(|source| ActionError::FetchParent {
                call_sid: recording.call_sid.clone(),
                source,
            })
    }

    async fn fetch_payload(&self, recording: &Recording) -> Result<Bytes, ActionError> {
        self.source
            .fetch_payload(recording)
            .await
            .map_err(ActionError::FetchPayload)
    }

    async fn erase_one(
        &self,
        recording: &Recording,
        hooks: &RecordHooks,
    ) -> Result<(), ActionError> {
        let call = self.fetch_call(recording).await?;
        let payload = if self.config.needs_payload() {
            Some(self.fetch_payload(recording).await?)
        } else {
            None
        };

        if self.config.dry_run {
            info!(
                delete_call = self.config.delete_secondary,
                "DRY RUN: would erase recording"
            );
            return Ok(());
        }

        if let Some(pre) = &hooks.pre {
            pre.call(recording, &call, payload.as_ref())
                .await
                .map_err(ActionError::PreHook)?;
        }

        if self.config.delete_secondary {
            // Issued together, both awaited. Either half may land without the other.
            let (primary, secondary) = tokio::join!(
                self.source.delete_recording(recording),
                self.source.delete_call(recording, &call),
            );
            match (primary, secondary) {
                (Ok(()), Ok(())) => {}
                (Err(error), Ok(())) => {
                    warn!(%error, "Call deleted but recording deletion failed");
                    return Err(ActionError::DeletePrimary(error));
                }
                (Ok(()), Err(source)) => {
                    warn!(error = %source, "Recording deleted but call deletion failed");
                    return Err(ActionError::DeleteSecondary {
                        call_sid: call.sid.clone(),
                        source,
                    });
                }
                (Err(error), Err(secondary)) => {
                    debug!(error = %secondary, "Call deletion also failed");
                    return Err(ActionError::DeletePrimary(error));
                }
            }
        } else {
            self.source
                .delete_recording(recording)
                .await
                .map_err(ActionError::DeletePrimary)?;
        }
        debug!("Recording erased");

        if let Some(post) = &hooks.post {
            post.call(recording, &call, payload.as_ref())
                .await
                .map_err(ActionError::PostHook)?;
        }

        Ok(())
    }

    async fn archive_one(
        &self,
        recording: &Recording,
        storage: &dyn ArchiveStorage,
        extension: &str,
    ) -> Result<(), ActionError> {
        let payload = self.fetch_payload(recording).await?;
        let call = self.fetch_call(recording).await?;
        let key = archive_key(recording, &call, extension);

        if self.config.dry_run {
            info!(%key, size = payload.len(), "DRY RUN: would archive recording");
            return Ok(());
        }

        match storage.store(&key, payload).await {
            Ok(location) => {
                debug!(%location, backend = storage.backend_name(), "Recording archived");
                Ok(())
            }
            Err(source) => Err(ActionError::Archive { key, source }),
        }
    }
}
