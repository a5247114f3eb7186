use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;

use super::ApiError;
use crate::models::{ParentCall, Recording, RecordingPage};

/// The remote system a sweep reads from and mutates.
///
/// Implemented over HTTP by [`crate::services::RecordingsClient`]. Shared by
/// every in-flight record action, so implementations must be safe for
/// concurrent use.
#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// First page of recordings created on or before `cutoff`.
    async fn first_page(&self, cutoff: NaiveDate, page_size: u32)
    -> Result<RecordingPage, ApiError>;

    /// Page addressed by a cursor from a previous page.
    async fn next_page(&self, cursor: &str) -> Result<RecordingPage, ApiError>;

    /// The call a recording belongs to.
    async fn fetch_call(&self, recording: &Recording) -> Result<ParentCall, ApiError>;

    /// Raw recording audio.
    async fn fetch_payload(&self, recording: &Recording) -> Result<Bytes, ApiError>;

    async fn delete_recording(&self, recording: &Recording) -> Result<(), ApiError>;

    async fn delete_call(&self, recording: &Recording, call: &ParentCall) -> Result<(), ApiError>;
}
