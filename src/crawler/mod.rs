//! Transport boundary for the comment engine
//!
//! The engine never talks to the network directly. Everything goes through a
//! [`Transport`], injected as `Arc<dyn Transport>`, so that fetches can be
//! driven against a live HTTP client or a scripted stub alike.

pub mod fetcher;
pub mod headers;
pub mod url;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::utils::error::FetchError;

/// Client version announced when the host page carries no client config
pub const DEFAULT_CLIENT_VERSION: &str = "2.20240101.00.00";

/// Request context sent along with every continuation exchange
///
/// Built from the host page's client configuration blob when available.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientContext {
    /// Public API key embedded in the page, appended as a query parameter
    pub api_key: Option<String>,

    /// The `context` object posted with every API request
    pub context: Value,
}

impl ClientContext {
    /// Minimal web-client context
    pub fn web(language: &str, region: &str) -> Self {
        Self {
            api_key: None,
            context: json!({
                "client": {
                    "clientName": "WEB",
                    "clientVersion": DEFAULT_CLIENT_VERSION,
                    "hl": language,
                    "gl": region,
                }
            }),
        }
    }

    /// Build a context from a parsed client configuration blob
    ///
    /// Falls back to the default web context for whichever part is missing.
    pub fn from_ytcfg(ytcfg: &Value) -> Self {
        let api_key = ytcfg
            .get("INNERTUBE_API_KEY")
            .and_then(Value::as_str)
            .map(str::to_string);

        let context = match ytcfg.get("INNERTUBE_CONTEXT") {
            Some(ctx) if ctx.is_object() => ctx.clone(),
            _ => Self::default().context,
        };

        Self { api_key, context }
    }
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::web("en", "US")
    }
}

/// Black-box request function used by the engine
///
/// Implementations apply their own retry policy; any error they return is
/// treated as fatal for the fetch that issued the request. Implementations
/// must be safe to share between concurrent fetches.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Download the host page of a video
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, FetchError>;

    /// Exchange a continuation token for the next raw API response
    async fn fetch_continuation(
        &self,
        token: &str,
        client: &ClientContext,
    ) -> Result<Value, FetchError>;
}
