//! HTTP fetcher for the Bilibili web API
//!
//! This module provides the transport used by the comment client:
//! - User-Agent rotation (or a fixed agent from configuration)
//! - Referer and optional login cookie headers
//! - An explicit per-request timeout
//! - Decoding of the `{code, message, data}` response envelope
//!
//! It performs exactly one request per call. Retrying is left to callers.

use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT},
    Client, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::models::Credential;
use crate::utils::error::FetchError;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://api.bilibili.com";

/// Default referer; the API rejects some requests without one
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com";

/// Response envelope shared by all `x/...` endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// 0 on success
    pub code: i64,

    #[serde(default)]
    pub message: String,

    /// Absent or `null` on most errors
    pub data: Option<T>,
}

/// Bilibili API fetcher
pub struct BiliFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// API host, overridable for mock servers
    base_url: String,

    /// Referer header value
    referer: String,

    /// Fixed user agent; rotated when `None`
    user_agent: Option<String>,
}

impl BiliFetcher {
    /// Create a fetcher against the public API with the given timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a fetcher against a custom host (used by tests with mock servers)
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: None,
        })
    }

    /// Create a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let mut fetcher = Self::with_base_url(&config.api.base_url, config.request_timeout())?;
        fetcher.referer = config.api.referer.clone();
        fetcher.user_agent = config.api.user_agent.clone();
        Ok(fetcher)
    }

    /// API host this fetcher talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one GET and decode the response envelope
    ///
    /// # Arguments
    ///
    /// * `path` - Endpoint path, e.g. `/x/v2/reply`
    /// * `query` - Query parameters
    /// * `credential` - Optional login cookies
    ///
    /// # Errors
    ///
    /// - `FetchError::NotFound` on HTTP 404
    /// - `FetchError::ServerError` on any other non-success status
    /// - `FetchError::Timeout` when the request times out
    /// - `FetchError::Decode` when the body is not a valid envelope
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        credential: Option<&Credential>,
    ) -> Result<ApiEnvelope<T>, FetchError> {
        let url = format!("{}{path}", self.base_url);
        let headers = self.build_headers(credential);

        tracing::debug!(url = %url, query = ?query, "Requesting API");

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(format!("{path} returned 404")));
        }
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        serde_json::from_slice::<ApiEnvelope<T>>(&body)
            .map_err(|e| FetchError::Decode(format!("invalid response from {path}: {e}")))
    }

    /// Build HTTP headers for API requests
    fn build_headers(&self, credential: Option<&Credential>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let user_agent = self
            .user_agent
            .as_deref()
            .unwrap_or_else(|| self.random_user_agent());
        if let Ok(value) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, value);
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        if let Ok(referer) = HeaderValue::from_str(&self.referer) {
            headers.insert(REFERER, referer);
        }

        if let Some(credential) = credential {
            match HeaderValue::from_str(&credential.cookie_header()) {
                Ok(mut cookie) => {
                    cookie.set_sensitive(true);
                    headers.insert(COOKIE, cookie);
                }
                Err(_) => {
                    tracing::warn!("Credential contains invalid header characters, sending anonymously")
                }
            }
        }

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}
