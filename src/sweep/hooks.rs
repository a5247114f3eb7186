//! Caller-supplied callbacks around the erase action.
//!
//! A pre-hook runs after the fetch steps and before any deletion; a failing
//! pre-hook aborts the action so nothing is deleted. A post-hook runs after
//! both deletions succeed.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::HookError;
use crate::{
    models::{ParentCall, Recording},
    services::{ArchiveStorage, archive_key},
};

/// A callback invoked with the recording, its call, and the audio if fetched.
#[async_trait]
pub trait RecordHook: Send + Sync {
    async fn call(
        &self,
        recording: &Recording,
        call: &ParentCall,
        payload: Option<&Bytes>,
    ) -> Result<(), HookError>;
}

/// Hooks injected into the erase action when the sweep starts.
#[derive(Clone, Default)]
pub struct RecordHooks {
    pub pre: Option<Arc<dyn RecordHook>>,
    pub post: Option<Arc<dyn RecordHook>>,
}

impl RecordHooks {
    pub fn with_pre(mut self, hook: Arc<dyn RecordHook>) -> Self {
        self.pre = Some(hook);
        self
    }

    pub fn with_post(mut self, hook: Arc<dyn RecordHook>) -> Self {
        self.post = Some(hook);
        self
    }
}

impl std::fmt::Debug for RecordHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordHooks")
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .finish()
    }
}

/// Pre-hook that archives the audio before it is erased.
pub struct ArchiveHook {
    storage: Arc<dyn ArchiveStorage>,
    extension: String,
}

impl ArchiveHook {
    pub fn new(storage: Arc<dyn ArchiveStorage>, extension: impl Into<String>) -> Self {
        Self {
            storage,
            extension: extension.into(),
        }
    }
}

#[async_trait]
impl RecordHook for ArchiveHook {
    async fn call(
        &self,
        recording: &Recording,
        call: &ParentCall,
        payload: Option<&Bytes>,
    ) -> Result<(), HookError> {
        let payload = payload.ok_or(HookError::MissingPayload)?;
        let key = archive_key(recording, call, &self.extension);
        let location = self.storage.store(&key, payload.clone()).await?;
        debug!(recording_sid = %recording.sid, %location, "Archived before erase");
        Ok(())
    }
}
