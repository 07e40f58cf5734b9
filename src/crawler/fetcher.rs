//! HTTP transport with rate limiting and retries
//!
//! This module provides the production [`Transport`] implementation with
//! features including:
//! - User-Agent rotation
//! - Rate limiting with governor
//! - Automatic retry with exponential backoff on transient failures
//! - Base URL override for mock servers

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{header::HeaderMap, Client, Response};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::time::Duration;

use super::headers::{build_api_headers, build_page_headers};
use super::{ClientContext, Transport};
use crate::config::{FetcherConfig, DEFAULT_BASE_URL};
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::token_preview;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// Path of the continuation endpoint, relative to the platform origin
const NEXT_ENDPOINT: &str = "/youtubei/v1/next";

/// Rate-limited HTTP transport for the platform
///
/// Cheap to share behind an `Arc`; concurrent fetches all draw from the same
/// rate limiter.
pub struct YoutubeFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Backoff policy for transient failures
    retry: RetryConfig,

    /// Platform origin, overridable for mock servers
    base_url: String,

    /// Fixed user agent; rotates through [`USER_AGENTS`] when unset
    user_agent: Option<String>,

    language: String,
    region: String,
}

impl YoutubeFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, 3, Duration::from_secs(30))
    }

    /// Create a new fetcher with custom rate, retry and timeout settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let config = FetcherConfig {
            requests_per_second,
            max_retries,
            request_timeout_secs: timeout.as_secs().max(1),
            ..FetcherConfig::default()
        };
        Self::from_config(&config)
    }

    /// Create a fetcher from the transport section of the configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            retry: config.retry_config(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            language: config.language.clone(),
            region: config.region.clone(),
        })
    }

    /// Create a new fetcher with a custom base URL for testing
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_base_url(base_url: &str, requests_per_second: u32) -> Result<Self, FetchError> {
        let mut fetcher = Self::new(requests_per_second)?;
        fetcher.base_url = base_url.trim_end_matches('/').to_string();
        Ok(fetcher)
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Platform origin this fetcher talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn watch_url(&self, video_id: &str) -> String {
        format!(
            "{}/watch?v={video_id}&hl={}&gl={}",
            self.base_url, self.language, self.region
        )
    }

    fn continuation_url(&self, client: &ClientContext) -> String {
        match &client.api_key {
            Some(key) => format!(
                "{}{NEXT_ENDPOINT}?key={key}&prettyPrint=false",
                self.base_url
            ),
            None => format!("{}{NEXT_ENDPOINT}?prettyPrint=false", self.base_url),
        }
    }

    /// Send one request, mapping status codes to `FetchError`
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status.as_u16() == 429 {
            Err(FetchError::RateLimit)
        } else {
            Err(FetchError::ServerError(status.as_u16()))
        }
    }

    async fn get_text(&self, url: &str, headers: HeaderMap) -> Result<String, FetchError> {
        with_retry_if(
            &self.retry,
            || async {
                let response = self.send(self.client.get(url).headers(headers.clone())).await?;
                response.text().await.map_err(FetchError::Http)
            },
            FetchError::is_transient,
        )
        .await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &Value,
    ) -> Result<Value, FetchError> {
        let text = with_retry_if(
            &self.retry,
            || async {
                let request = self
                    .client
                    .post(url)
                    .headers(headers.clone())
                    .body(body.to_string());
                let response = self.send(request).await?;
                response.text().await.map_err(FetchError::Http)
            },
            FetchError::is_transient,
        )
        .await?;

        serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Get the user agent for the next request
    fn user_agent(&self) -> &str {
        match &self.user_agent {
            Some(agent) => agent.as_str(),
            None => {
                let mut rng = rand::thread_rng();
                USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
            }
        }
    }
}

#[async_trait]
impl Transport for YoutubeFetcher {
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, FetchError> {
        let url = self.watch_url(video_id);
        tracing::debug!(url = %url, "Fetching watch page");

        let headers = build_page_headers(self.user_agent(), &self.language);
        self.get_text(&url, headers).await
    }

    async fn fetch_continuation(
        &self,
        token: &str,
        client: &ClientContext,
    ) -> Result<Value, FetchError> {
        let url = self.continuation_url(client);
        tracing::debug!(token = %token_preview(token), "Exchanging continuation token");

        let origin = if self.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            self.base_url.as_str()
        };
        let headers = build_api_headers(self.user_agent(), &self.language, origin);
        let body = json!({
            "context": client.context,
            "continuation": token,
        });

        self.post_json(&url, headers, &body).await
    }
}
