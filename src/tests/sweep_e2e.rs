//! End-to-end sweeps through the HTTP client.
//!
//! Each test stands up a mock recordings API, builds a [`Sweeper`] from a TOML
//! config pointing at it, and checks both the [`SweepResult`] and the exact
//! requests the API received. Mocks with `expect(n)` are verified when the
//! server drops.

use chrono::NaiveDate;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

use crate::{
    config::SweeperConfig,
    sweep::{SweepError, SweepResult, Sweeper, TerminalReason},
};

const ACCOUNT_PATH: &str = "/2010-04-01/Accounts/AC1";

// =============================================================================
// Harness
// =============================================================================

struct SweepHarness {
    server: MockServer,
}

impl SweepHarness {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
    }

    /// Config with the given `[sweep]` body and trailing sections.
    fn config(&self, sweep: &str, extra: &str) -> SweeperConfig {
        let toml = format!(
            r#"
[sweep]
{sweep}

[api]
root_url = "{uri}"
account_id = "AC1"
auth_token = "secret"

{extra}
"#,
            uri = self.server.uri()
        );
        SweeperConfig::from_str(&toml).unwrap()
    }

    async fn sweep(&self, config: &SweeperConfig) -> Result<SweepResult, SweepError> {
        Sweeper::from_config(config)
            .await
            .unwrap()
            .sweep(Self::cutoff())
            .await
    }

    async fn mount_first_page(&self, recordings: Vec<Value>, next: Option<&str>) {
        Mock::given(method("GET"))
            .and(path(format!("{ACCOUNT_PATH}/Recordings.json")))
            .and(query_param("DateCreated<", "2020-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(recordings, 0, next)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    async fn mount_page(&self, token: &str, index: u32, recordings: Vec<Value>, hits: u64) {
        Mock::given(method("GET"))
            .and(path(format!("{ACCOUNT_PATH}/Recordings.json")))
            .and(query_param("PageToken", token))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(recordings, index, None)))
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    async fn mount_call(&self, n: u32, status: u16, hits: u64) {
        let response = if status == 200 {
            ResponseTemplate::new(200).set_body_json(json!({
                "sid": format!("CA{n}"),
                "from": format!("+1555000{n:04}"),
                "to": "+15559999999",
                "uri": format!("{ACCOUNT_PATH}/Calls/CA{n}.json"),
            }))
        } else {
            ResponseTemplate::new(status).set_body_string("call lookup failed")
        };
        Mock::given(method("GET"))
            .and(path(format!("{ACCOUNT_PATH}/Calls/CA{n}.json")))
            .respond_with(response)
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    async fn mount_payload(&self, n: u32, hits: u64) {
        Mock::given(method("GET"))
            .and(path(format!("{ACCOUNT_PATH}/Recordings/RE{n}.mp3")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload(n)))
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    async fn mount_delete_recording(&self, n: u32, status: u16, hits: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!("{ACCOUNT_PATH}/Recordings/RE{n}.json")))
            .respond_with(ResponseTemplate::new(status))
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    async fn mount_delete_call(&self, n: u32, hits: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!("{ACCOUNT_PATH}/Calls/CA{n}.json")))
            .respond_with(ResponseTemplate::new(204))
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    /// Fail the test if anything at all is deleted.
    async fn forbid_deletes(&self) {
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&self.server)
            .await;
    }
}

fn recording(n: u32, status: &str) -> Value {
    json!({
        "sid": format!("RE{n}"),
        "account_sid": "AC1",
        "call_sid": format!("CA{n}"),
        "date_created": format!("{n:02} Jan 2020 10:15:30 +0000"),
        "status": status,
        "duration": "14",
        "uri": format!("{ACCOUNT_PATH}/Recordings/RE{n}.json"),
    })
}

fn page(recordings: Vec<Value>, index: u32, next: Option<&str>) -> Value {
    json!({
        "recordings": recordings,
        "page": index,
        "end": 0,
        "next_page_uri": next,
    })
}

fn payload(n: u32) -> Vec<u8> {
    format!("ID3-audio-{n}").into_bytes()
}

fn filesystem_storage(dir: &TempDir) -> String {
    format!(
        r#"
[storage]
backend = "filesystem"

[storage.filesystem]
path = "{}"
key_prefix = "vm"
"#,
        dir.path().display()
    )
}

// =============================================================================
// Erase
// =============================================================================

#[tokio::test]
async fn test_erase_skips_unfinished_recording() {
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(
            vec![
                recording(1, "completed"),
                recording(2, "in-progress"),
                recording(3, "completed"),
            ],
            None,
        )
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_call(2, 200, 0).await;
    harness.mount_call(3, 200, 1).await;
    harness.mount_delete_recording(1, 204, 1).await;
    harness.mount_delete_recording(2, 204, 0).await;
    harness.mount_delete_recording(3, 204, 1).await;
    harness.mount_delete_call(1, 0).await;
    harness.mount_delete_call(3, 0).await;

    let config = harness.config("mode = \"erase\"\nconcurrency_limit = 2", "");
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.terminal_reason, TerminalReason::CursorExhausted);
    assert_eq!(result.failures, 0);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.completed, 2);
    assert_eq!(result.observed, 3);
}

#[tokio::test]
async fn test_erase_parent_failure_is_isolated() {
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(
            vec![
                recording(1, "completed"),
                recording(2, "completed"),
                recording(3, "completed"),
            ],
            None,
        )
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_call(2, 500, 1).await;
    harness.mount_call(3, 200, 1).await;
    harness.mount_delete_recording(1, 204, 1).await;
    harness.mount_delete_recording(2, 204, 0).await;
    harness.mount_delete_recording(3, 204, 1).await;

    let config = harness.config("mode = \"erase\"\nconcurrency_limit = 2", "");
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.failures, 1);
    assert_eq!(result.completed, 2);
    assert_eq!(result.terminal_reason, TerminalReason::CursorExhausted);
    assert_eq!(result.failed_records[0].recording_sid, "RE2");
    assert!(result.failed_records[0].cause.contains("CA2"));
}

#[tokio::test]
async fn test_undecodable_entry_fails_alone() {
    let harness = SweepHarness::new().await;
    let mut broken = recording(2, "completed");
    broken["call_sid"] = Value::Null;
    harness
        .mount_first_page(
            vec![recording(1, "completed"), broken, recording(3, "completed")],
            None,
        )
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_call(3, 200, 1).await;
    harness.mount_delete_recording(1, 204, 1).await;
    harness.mount_delete_recording(2, 204, 0).await;
    harness.mount_delete_recording(3, 204, 1).await;

    let config = harness.config("mode = \"erase\"", "");
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.terminal_reason, TerminalReason::CursorExhausted);
    assert_eq!(result.observed, 3);
    assert_eq!(result.completed, 2);
    assert_eq!(result.failures, 1);
    assert_eq!(result.failed_records[0].recording_sid, "RE2");
    assert!(result.failed_records[0].cause.contains("could not be decoded"));
}

#[tokio::test]
async fn test_erase_deletes_call_when_enabled() {
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(vec![recording(1, "completed")], None)
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_delete_recording(1, 204, 1).await;
    harness.mount_delete_call(1, 1).await;

    let config = harness.config("mode = \"erase\"\ndelete_secondary = true", "");
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.completed, 1);
    assert_eq!(result.failures, 0);
}

#[tokio::test]
async fn test_erase_dry_run_deletes_nothing() {
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(vec![recording(1, "completed"), recording(2, "completed")], None)
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_call(2, 200, 1).await;
    harness.forbid_deletes().await;

    let config = harness.config(
        "mode = \"erase\"\ndelete_secondary = true\ndry_run = true",
        "",
    );
    let result = harness.sweep(&config).await.unwrap();

    assert!(result.dry_run);
    assert_eq!(result.completed, 2);
}

#[tokio::test]
async fn test_archive_before_erase() {
    let dir = TempDir::new().unwrap();
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(vec![recording(4, "completed")], None)
        .await;
    harness.mount_call(4, 200, 1).await;
    harness.mount_payload(4, 1).await;
    harness.mount_delete_recording(4, 204, 1).await;

    let config = harness.config(
        "mode = \"erase\"\nfetch_payload = true\narchive_before_erase = true",
        &filesystem_storage(&dir),
    );
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.completed, 1);
    let archived = dir
        .path()
        .join("vm/2020/1/4/+15550000004_20200104T10:15:30_UTC.mp3");
    assert_eq!(std::fs::read(archived).unwrap(), payload(4));
}

// =============================================================================
// Archive
// =============================================================================

#[tokio::test]
async fn test_archive_writes_audio_without_deleting() {
    let dir = TempDir::new().unwrap();
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(
            vec![
                recording(1, "completed"),
                recording(2, "absent"),
                recording(3, "completed"),
            ],
            None,
        )
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_call(3, 200, 1).await;
    harness.mount_payload(1, 1).await;
    harness.mount_payload(2, 0).await;
    harness.mount_payload(3, 1).await;
    harness.forbid_deletes().await;

    let config = harness.config("mode = \"archive\"", &filesystem_storage(&dir));
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.completed, 2);
    assert_eq!(result.skipped, 1);
    for n in [1, 3] {
        let archived = dir.path().join(format!(
            "vm/2020/1/{n}/+1555000000{n}_202001{n:02}T10:15:30_UTC.mp3"
        ));
        assert_eq!(std::fs::read(archived).unwrap(), payload(n));
    }
}

// =============================================================================
// Pagination and termination
// =============================================================================

#[tokio::test]
async fn test_follows_next_page_uri() {
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(
            vec![recording(1, "completed"), recording(2, "completed")],
            Some("/2010-04-01/Accounts/AC1/Recordings.json?PageSize=2&Page=1&PageToken=PA2"),
        )
        .await;
    harness
        .mount_page("PA2", 1, vec![recording(3, "completed")], 1)
        .await;
    for n in 1..=3 {
        harness.mount_call(n, 200, 1).await;
        harness.mount_delete_recording(n, 204, 1).await;
    }

    let config = harness.config("mode = \"erase\"\npage_size = 2", "");
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.pages, 2);
    assert_eq!(result.observed, 3);
    assert_eq!(result.completed, 3);
    assert_eq!(result.terminal_reason, TerminalReason::CursorExhausted);
}

#[tokio::test]
async fn test_budget_exceeded_skips_remaining_pages() {
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(
            vec![recording(1, "completed"), recording(2, "completed")],
            Some("/2010-04-01/Accounts/AC1/Recordings.json?Page=1&PageToken=PA2"),
        )
        .await;
    harness
        .mount_page("PA2", 1, vec![recording(3, "completed")], 0)
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_call(2, 200, 1).await;
    harness.mount_delete_recording(1, 503, 1).await;
    harness.mount_delete_recording(2, 503, 1).await;

    let config = harness.config("mode = \"erase\"\nfailure_budget = 2", "");
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.terminal_reason, TerminalReason::BudgetExceeded);
    assert_eq!(result.failures, 2);
    assert_eq!(result.pages, 1);
}

#[tokio::test]
async fn test_ceiling_reached_skips_remaining_pages() {
    let harness = SweepHarness::new().await;
    harness
        .mount_first_page(
            vec![recording(1, "completed"), recording(2, "completed")],
            Some("/2010-04-01/Accounts/AC1/Recordings.json?Page=1&PageToken=PA2"),
        )
        .await;
    harness
        .mount_page("PA2", 1, vec![recording(3, "completed")], 0)
        .await;
    harness.mount_call(1, 200, 1).await;
    harness.mount_call(2, 200, 1).await;
    harness.mount_delete_recording(1, 204, 1).await;
    harness.mount_delete_recording(2, 204, 1).await;

    let config = harness.config("mode = \"erase\"\nrecord_ceiling = 2", "");
    let result = harness.sweep(&config).await.unwrap();

    assert_eq!(result.terminal_reason, TerminalReason::CeilingReached);
    assert_eq!(result.observed, 2);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let harness = SweepHarness::new().await;
    Mock::given(method("GET"))
        .and(path(format!("{ACCOUNT_PATH}/Recordings.json")))
        .respond_with(ResponseTemplate::new(500).set_body_string("listing unavailable"))
        .expect(1)
        .mount(&harness.server)
        .await;
    harness.forbid_deletes().await;

    let config = harness.config("mode = \"erase\"", "");
    let result = harness.sweep(&config).await;

    match result {
        Err(SweepError::Listing { page, source }) => {
            assert_eq!(page, 0);
            assert!(source.to_string().contains("500"));
        }
        other => panic!("expected listing failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_result_serializes_for_stdout() {
    let harness = SweepHarness::new().await;
    harness.mount_first_page(vec![], None).await;

    let config = harness.config("mode = \"erase\"", "");
    let result = harness.sweep(&config).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["terminal_reason"], "cursor_exhausted");
    assert_eq!(json["mode"], "erase");
    assert_eq!(json["cutoff"], "2020-06-01");
    assert_eq!(json["observed"], 0);
}
