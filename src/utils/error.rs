//! Error types for the ytmeta extraction engine
//!
//! This module defines custom error types used throughout the application.

use thiserror::Error;

use crate::models::SortOrder;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt at the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimit | Self::Timeout => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::MaxRetriesExceeded | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that can occur while reading the host page
#[derive(Error, Debug)]
pub enum ParseError {
    /// The embedded initial-state object is missing
    #[error("ytInitialData not found in page")]
    InitialDataNotFound,

    /// The embedded JSON could not be parsed
    #[error("Malformed embedded JSON in {name}: {reason}")]
    MalformedJson { name: &'static str, reason: String },

    /// Invalid video URL or id
    #[error("Invalid video reference: {0}")]
    InvalidVideoRef(String),
}

/// Terminal errors of a comment fetch
///
/// Record-level anomalies never show up here; they are logged and skipped.
#[derive(Error, Debug)]
pub enum CommentError {
    /// Transport-level failure after the transport's own retry policy
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(#[source] FetchError),

    /// None of the resolver strategies produced a usable continuation token
    #[error("No comment endpoint found for sort order '{sort}'")]
    EndpointNotFound { sort: SortOrder },

    /// Invalid parameter combination, rejected before any request
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CommentError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<FetchError> for CommentError {
    fn from(err: FetchError) -> Self {
        Self::ResourceUnavailable(err)
    }
}
