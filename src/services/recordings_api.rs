//! HTTP client for the recordings API.
//!
//! Speaks the Twilio REST layout: account-scoped resources live under
//! `{root}/{version}/Accounts/{account}/`, every request uses HTTP basic auth
//! with the account id and token, and listings return a `next_page_uri`
//! relative to the API root.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::ApiConfig,
    models::{ParentCall, Recording, RecordingPage},
    sweep::{ApiError, RecordingSource},
};

/// Recordings API client. Cheap to share: the underlying connection pool is
/// reference counted.
#[derive(Clone)]
pub struct RecordingsClient {
    http: reqwest::Client,
    root_url: String,
    account_base: Url,
    account_id: String,
    auth_token: String,
    payload_format: String,
}

impl std::fmt::Debug for RecordingsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingsClient")
            .field("account_base", &self.account_base.as_str())
            .field("account_id", &self.account_id)
            .field("auth_token", &"****")
            .field("payload_format", &self.payload_format)
            .finish()
    }
}

impl RecordingsClient {
    /// Build a client with its own connection pool from `[api.http]`.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = config.http.build_client()?;
        Self::with_client(http, config)
    }

    /// Build a client around an existing reqwest client.
    pub fn with_client(http: reqwest::Client, config: &ApiConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            root_url: config.root_url.trim_end_matches('/').to_string(),
            account_base: Url::parse(&config.account_base_url())?,
            account_id: config.account_id.clone(),
            auth_token: config.auth_token.clone(),
            payload_format: config.payload_format.clone(),
        })
    }

    fn listing_url(&self, cutoff: NaiveDate, page_size: u32) -> Result<Url, ApiError> {
        let mut url = self.account_base.join("Recordings.json")?;
        url.query_pairs_mut()
            .append_pair("PageSize", &page_size.to_string())
            .append_pair("DateCreated<", &cutoff.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    /// Resolve a server-relative URI from a response against the root URL,
    /// keeping any path prefix the root carries.
    fn resolve(&self, uri: &str) -> Result<Url, ApiError> {
        let separator = if uri.starts_with('/') { "" } else { "/" };
        Ok(Url::parse(&format!("{}{separator}{uri}", self.root_url))?)
    }

    fn call_url(&self, call_sid: &str) -> Result<Url, ApiError> {
        Ok(self.account_base.join(&format!("Calls/{call_sid}.json"))?)
    }

    fn payload_url(&self, recording_sid: &str) -> Result<Url, ApiError> {
        Ok(self
            .account_base
            .join(&format!("Recordings/{recording_sid}.{}", self.payload_format))?)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> Result<reqwest::Response, ApiError> {
        let method_name = match method {
            reqwest::Method::DELETE => "DELETE",
            _ => "GET",
        };
        let response = self
            .http
            .request(method, url.clone())
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method: method_name,
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.send(reqwest::Method::GET, url.clone()).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn delete(&self, url: Url) -> Result<(), ApiError> {
        self.send(reqwest::Method::DELETE, url).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordingSource for RecordingsClient {
    #[instrument(skip(self))]
    async fn first_page(
        &self,
        cutoff: NaiveDate,
        page_size: u32,
    ) -> Result<RecordingPage, ApiError> {
        let url = self.listing_url(cutoff, page_size)?;
        let page: RecordingPage = self.get_json(url).await?;
        debug!(records = page.recordings.len(), end = page.end, "Fetched first page");
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn next_page(&self, cursor: &str) -> Result<RecordingPage, ApiError> {
        let url = self.resolve(cursor)?;
        let page: RecordingPage = self.get_json(url).await?;
        debug!(
            page = page.page,
            records = page.recordings.len(),
            end = page.end,
            "Fetched page"
        );
        Ok(page)
    }

    #[instrument(skip(self, recording), fields(call_sid = %recording.call_sid))]
    async fn fetch_call(&self, recording: &Recording) -> Result<ParentCall, ApiError> {
        let url = self.call_url(&recording.call_sid)?;
        let body: serde_json::Value = self.get_json(url.clone()).await?;
        ParentCall::from_json(body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    #[instrument(skip(self, recording), fields(recording_sid = %recording.sid))]
    async fn fetch_payload(&self, recording: &Recording) -> Result<Bytes, ApiError> {
        let url = self.payload_url(&recording.sid)?;
        let response = self.send(reqwest::Method::GET, url).await?;
        Ok(response.bytes().await?)
    }

    #[instrument(skip(self, recording), fields(recording_sid = %recording.sid))]
    async fn delete_recording(&self, recording: &Recording) -> Result<(), ApiError> {
        let url = self.resolve(&recording.uri)?;
        self.delete(url).await
    }

    #[instrument(skip(self, recording, call), fields(call_sid = %call.sid))]
    async fn delete_call(&self, recording: &Recording, call: &ParentCall) -> Result<(), ApiError> {
        let url = match call.uri.as_deref().filter(|uri| !uri.is_empty()) {
            Some(uri) => self.resolve(uri)?,
            None => self.call_url(&recording.call_sid)?,
        };
        self.delete(url).await
    }
}
