use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A recording as returned by the recordings listing.
///
/// Listed recordings are never mutated by a sweep; actions only operate on
/// the remote resources they name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    /// Unique identifier (e.g., "RE...")
    pub sid: String,
    /// Identifier of the call the recording belongs to
    pub call_sid: String,
    /// When the recording was created
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date_created: DateTime<Utc>,
    /// Processing status (e.g., "completed", "processing", "absent")
    pub status: String,
    /// Path of the recording resource, relative to the API root
    pub uri: String,
    /// Duration in seconds, as reported by the API
    #[serde(default)]
    pub duration: Option<String>,
}

impl Recording {
    /// Whether the recording was created on or before `cutoff` (UTC date).
    pub fn created_on_or_before(&self, cutoff: NaiveDate) -> bool {
        self.date_created.date_naive() <= cutoff
    }
}

/// The call a recording belongs to.
///
/// Only `sid` and `from` are interpreted; the full JSON body is kept so
/// hooks see everything the API returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentCall {
    /// Unique identifier (e.g., "CA...")
    pub sid: String,
    /// Originating number or client identifier
    pub from: String,
    /// Path of the call resource, relative to the API root
    #[serde(default)]
    pub uri: Option<String>,
    /// The raw response body
    #[serde(skip)]
    pub body: serde_json::Value,
}

impl ParentCall {
    /// Decode a call from its JSON body, keeping the body alongside.
    pub fn from_json(body: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut call: ParentCall = serde_json::from_value(body.clone())?;
        call.body = body;
        Ok(call)
    }
}

/// A listed entry that could not be decoded as a [`Recording`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRecording {
    /// The entry's `sid`, when it had a string one
    pub sid: Option<String>,
    /// Why decoding failed
    pub error: String,
}

/// One page of the recordings listing.
///
/// Entries are decoded one by one: an undecodable entry lands in `malformed`
/// instead of failing the whole page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawRecordingPage")]
pub struct RecordingPage {
    /// Recordings on this page, in listing order
    pub recordings: Vec<Recording>,
    /// Entries that failed to decode
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub malformed: Vec<MalformedRecording>,
    /// Zero-based index of the last record on this page across the whole listing
    #[serde(default)]
    pub end: i64,
    /// Zero-based page number
    #[serde(default)]
    pub page: u32,
    /// Path of the next page, absent on the final page
    #[serde(default)]
    pub next_page_uri: Option<String>,
}

#[derive(Deserialize)]
struct RawRecordingPage {
    #[serde(default)]
    recordings: Vec<serde_json::Value>,
    #[serde(default)]
    end: i64,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    next_page_uri: Option<String>,
}

impl From<RawRecordingPage> for RecordingPage {
    fn from(raw: RawRecordingPage) -> Self {
        let mut recordings = Vec::with_capacity(raw.recordings.len());
        let mut malformed = Vec::new();
        for entry in raw.recordings {
            let sid = entry.get("sid").and_then(|v| v.as_str()).map(str::to_string);
            match serde_json::from_value::<Recording>(entry) {
                Ok(recording) => recordings.push(recording),
                Err(e) => malformed.push(MalformedRecording {
                    sid,
                    error: e.to_string(),
                }),
            }
        }
        Self {
            recordings,
            malformed,
            end: raw.end,
            page: raw.page,
            next_page_uri: raw.next_page_uri,
        }
    }
}

impl RecordingPage {
    /// Cursor for the next page, treating an empty URI as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_uri.as_deref().filter(|uri| !uri.is_empty())
    }
}

/// Accept both RFC 2822 (`Tue, 10 Mar 2020 08:30:00 +0000`, the API's native
/// format) and RFC 3339 timestamps.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid timestamp '{raw}', expected RFC 2822 or RFC 3339"
        ))
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
