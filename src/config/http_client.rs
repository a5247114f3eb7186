use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP client configuration for the recordings API.
///
/// One client is built per sweep and shared by every in-flight record action,
/// so the idle pool should be at least as large as `sweep.concurrency_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct HttpClientConfig {
    /// Request timeout in seconds.
    /// Covers connection, request, and the full response body (audio downloads included).
    #[serde(default = "default_http_client_timeout")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_http_client_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum idle connections to keep per host.
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// Idle connection timeout in seconds.
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,

    /// Outbound proxy URL applied to all requests (e.g., "http://proxy.internal:3128").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Hosts that bypass the proxy, in `NO_PROXY` syntax (e.g., "localhost,.internal").
    #[serde(default)]
    pub no_proxy: Option<String>,

    /// User-Agent header to send with requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_client_timeout(),
            connect_timeout_secs: default_http_client_connect_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout_secs: default_pool_idle_timeout(),
            proxy: None,
            no_proxy: None,
            user_agent: default_user_agent(),
        }
    }
}

impl HttpClientConfig {
    /// Validate the proxy URL, if any.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(proxy) = &self.proxy {
            url::Url::parse(proxy)
                .map_err(|e| format!("api.http.proxy is not a valid URL ({proxy}): {e}"))?;
        }
        Ok(())
    }

    /// Build a reqwest Client from this configuration.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .user_agent(&self.user_agent);

        if let Some(proxy_url) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)?.no_proxy(
                self.no_proxy
                    .as_deref()
                    .and_then(reqwest::NoProxy::from_string),
            );
            builder = builder.proxy(proxy);
        }

        builder.build()
    }
}

// Default: 2 minutes, long enough for large audio downloads
fn default_http_client_timeout() -> u64 {
    120
}

fn default_http_client_connect_timeout() -> u64 {
    10
}

// Default: matches the default sweep concurrency limit
fn default_pool_max_idle_per_host() -> usize {
    20
}

fn default_pool_idle_timeout() -> u64 {
    90
}

fn default_user_agent() -> String {
    format!("voicemail-sweeper/{}", env!("CARGO_PKG_VERSION"))
}
