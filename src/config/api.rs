//! Recordings API configuration.
//!
//! # Example
//!
//! ```toml
//! [api]
//! account_id = "${ACCOUNT_ID}"
//! auth_token = "${AUTH_TOKEN}"
//!
//! [api.http]
//! proxy = "http://proxy.internal:3128"
//! ```

use serde::{Deserialize, Serialize};

use super::HttpClientConfig;

/// Connection settings for the telephony recordings API.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Scheme and host of the API. Next-page URIs returned by the listing
    /// are resolved against this.
    /// Default: "https://api.twilio.com"
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// API version path segment.
    /// Default: "2010-04-01"
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Account identifier, also used as the basic-auth username.
    #[serde(default)]
    pub account_id: String,

    /// Account auth token, used as the basic-auth password.
    #[serde(default)]
    pub auth_token: String,

    /// Audio format requested when downloading a recording. Also used as the
    /// archive object extension.
    /// Default: "mp3"
    #[serde(default = "default_payload_format")]
    pub payload_format: String,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpClientConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            api_version: default_api_version(),
            account_id: String::new(),
            auth_token: String::new(),
            payload_format: default_payload_format(),
            http: HttpClientConfig::default(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("root_url", &self.root_url)
            .field("api_version", &self.api_version)
            .field("account_id", &self.account_id)
            .field(
                "auth_token",
                &if self.auth_token.is_empty() { "" } else { "****" },
            )
            .field("payload_format", &self.payload_format)
            .field("http", &self.http)
            .finish()
    }
}

fn default_root_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_api_version() -> String {
    "2010-04-01".to_string()
}

fn default_payload_format() -> String {
    "mp3".to_string()
}

impl ApiConfig {
    /// Validate the API configuration. Credentials are required.
    pub fn validate(&self) -> Result<(), String> {
        if self.account_id.trim().is_empty() {
            return Err("api.account_id is required".to_string());
        }
        if self.auth_token.trim().is_empty() {
            return Err("api.auth_token is required".to_string());
        }
        url::Url::parse(&self.root_url)
            .map_err(|e| format!("api.root_url is not a valid URL ({}): {e}", self.root_url))?;
        if self.payload_format.is_empty() || self.payload_format.contains('/') {
            return Err(format!(
                "api.payload_format '{}' is not a valid extension",
                self.payload_format
            ));
        }
        self.http.validate()
    }

    /// Base URL for account-scoped resources, with a trailing slash so
    /// relative paths join beneath it.
    pub fn account_base_url(&self) -> String {
        format!(
            "{}/{}/Accounts/{}/",
            self.root_url.trim_end_matches('/'),
            self.api_version.trim_matches('/'),
            self.account_id
        )
    }
}
