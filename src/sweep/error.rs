use thiserror::Error;

use crate::services::ArchiveStorageError;

/// Errors returned by the recordings API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors raised by caller-supplied pre/post hooks.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),

    #[error("Hook requires the recording audio but none was fetched")]
    MissingPayload,

    #[error(transparent)]
    Storage(#[from] ArchiveStorageError),
}

/// Why a single record action failed. Carried inside the failure outcome,
/// never propagated past the action boundary.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("listing entry could not be decoded: {0}")]
    Malformed(String),

    #[error("failed to fetch call {call_sid}: {source}")]
    FetchParent {
        call_sid: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to fetch audio: {0}")]
    FetchPayload(#[source] ApiError),

    #[error("pre-action hook failed: {0}")]
    PreHook(#[source] HookError),

    #[error("failed to delete recording: {0}")]
    DeletePrimary(#[source] ApiError),

    #[error("failed to delete call {call_sid}: {source}")]
    DeleteSecondary {
        call_sid: String,
        #[source]
        source: ApiError,
    },

    #[error("post-action hook failed: {0}")]
    PostHook(#[source] HookError),

    #[error("failed to archive to {key}: {source}")]
    Archive {
        key: String,
        #[source]
        source: ArchiveStorageError,
    },
}

/// Fatal sweep errors. Anything not listed here is recorded per record.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Invalid sweep configuration: {0}")]
    Config(String),

    #[error("Failed to fetch listing page {page}: {source}")]
    Listing {
        page: u32,
        #[source]
        source: ApiError,
    },

    #[error("Archive storage setup failed: {0}")]
    Storage(#[from] ArchiveStorageError),

    #[error("Concurrency throttle closed")]
    ThrottleClosed,
}
