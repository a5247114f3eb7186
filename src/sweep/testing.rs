//! In-memory recording source for engine tests.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use super::{ApiError, RecordingSource};
use crate::models::{ParentCall, Recording, RecordingPage};

/// Recording created at noon UTC on the given day, belonging to call `CA-{sid}`.
pub(crate) fn recording(sid: &str, status: &str, year: i32, month: u32, day: u32) -> Recording {
    Recording {
        sid: sid.to_string(),
        call_sid: format!("CA-{sid}"),
        date_created: Utc
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .unwrap(),
        status: status.to_string(),
        uri: format!("/2010-04-01/Accounts/AC1/Recordings/{sid}.json"),
        duration: Some("5".to_string()),
    }
}

fn status_error(method: &'static str, what: &str) -> ApiError {
    ApiError::Status {
        method,
        url: format!("fake://{what}"),
        status: 500,
        body: "injected failure".to_string(),
    }
}

/// Pages are addressed by the cursor `page-{n}`.
#[derive(Default)]
pub(crate) struct FakeSource {
    pages: Vec<Vec<Recording>>,
    fail_listing: HashSet<u32>,
    fail_call_fetch: HashSet<String>,
    fail_payload_fetch: HashSet<String>,
    fail_recording_delete: HashSet<String>,
    fail_call_delete: HashSet<String>,

    listing_cutoff: Mutex<Option<NaiveDate>>,
    pages_fetched: AtomicUsize,
    calls_fetched: AtomicUsize,
    payloads_fetched: AtomicUsize,
    deleted_recordings: Mutex<Vec<String>>,
    deleted_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn with_pages(pages: Vec<Vec<Recording>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub(crate) fn fail_listing(mut self, page: u32) -> Self {
        self.fail_listing.insert(page);
        self
    }

    pub(crate) fn fail_call_fetch(mut self, sid: &str) -> Self {
        self.fail_call_fetch.insert(sid.to_string());
        self
    }

    pub(crate) fn fail_payload_fetch(mut self, sid: &str) -> Self {
        self.fail_payload_fetch.insert(sid.to_string());
        self
    }

    pub(crate) fn fail_recording_delete(mut self, sid: &str) -> Self {
        self.fail_recording_delete.insert(sid.to_string());
        self
    }

    pub(crate) fn fail_call_delete(mut self, sid: &str) -> Self {
        self.fail_call_delete.insert(sid.to_string());
        self
    }

    pub(crate) fn caller_for(sid: &str) -> String {
        format!("+1555{}", sid.trim_start_matches("RE"))
    }

    pub(crate) fn payload_for(sid: &str) -> Vec<u8> {
        format!("audio-{sid}").into_bytes()
    }

    pub(crate) fn listing_cutoff(&self) -> Option<NaiveDate> {
        *self.listing_cutoff.lock().unwrap()
    }

    pub(crate) fn pages_fetched(&self) -> usize {
        self.pages_fetched.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_fetched(&self) -> usize {
        self.calls_fetched.load(Ordering::SeqCst)
    }

    pub(crate) fn payloads_fetched(&self) -> usize {
        self.payloads_fetched.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn deleted_recordings(&self) -> Vec<String> {
        let mut sids = self.deleted_recordings.lock().unwrap().clone();
        sids.sort();
        sids
    }

    pub(crate) fn deleted_calls(&self) -> Vec<String> {
        let mut sids = self.deleted_calls.lock().unwrap().clone();
        sids.sort();
        sids
    }

    fn page(&self, index: u32) -> Result<RecordingPage, ApiError> {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.contains(&index) {
            return Err(status_error("GET", &format!("page-{index}")));
        }
        let recordings = self.pages.get(index as usize).cloned().unwrap_or_default();
        let seen: usize = self.pages.iter().take(index as usize + 1).map(Vec::len).sum();
        let next = index + 1;
        Ok(RecordingPage {
            recordings,
            malformed: Vec::new(),
            end: seen as i64 - 1,
            page: index,
            next_page_uri: ((next as usize) < self.pages.len()).then(|| format!("page-{next}")),
        })
    }
}

#[async_trait]
impl RecordingSource for FakeSource {
    async fn first_page(
        &self,
        cutoff: NaiveDate,
        _page_size: u32,
    ) -> Result<RecordingPage, ApiError> {
        *self.listing_cutoff.lock().unwrap() = Some(cutoff);
        self.page(0)
    }

    async fn next_page(&self, cursor: &str) -> Result<RecordingPage, ApiError> {
        let index = cursor
            .strip_prefix("page-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ApiError::Decode {
                url: cursor.to_string(),
                message: "unknown cursor".to_string(),
            })?;
        self.page(index)
    }

    async fn fetch_call(&self, recording: &Recording) -> Result<ParentCall, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls_fetched.fetch_add(1, Ordering::SeqCst);
        if self.fail_call_fetch.contains(&recording.sid) {
            return Err(status_error("GET", &recording.call_sid));
        }
        Ok(ParentCall::from_json(json!({
            "sid": recording.call_sid,
            "from": Self::caller_for(&recording.sid),
        }))
        .unwrap())
    }

    async fn fetch_payload(&self, recording: &Recording) -> Result<Bytes, ApiError> {
        self.payloads_fetched.fetch_add(1, Ordering::SeqCst);
        if self.fail_payload_fetch.contains(&recording.sid) {
            return Err(status_error("GET", &recording.sid));
        }
        Ok(Bytes::from(Self::payload_for(&recording.sid)))
    }

    async fn delete_recording(&self, recording: &Recording) -> Result<(), ApiError> {
        if self.fail_recording_delete.contains(&recording.sid) {
            return Err(status_error("DELETE", &recording.sid));
        }
        self.deleted_recordings
            .lock()
            .unwrap()
            .push(recording.sid.clone());
        Ok(())
    }

    async fn delete_call(&self, recording: &Recording, call: &ParentCall) -> Result<(), ApiError> {
        if self.fail_call_delete.contains(&recording.sid) {
            return Err(status_error("DELETE", &call.sid));
        }
        self.deleted_calls.lock().unwrap().push(call.sid.clone());
        Ok(())
    }
}
