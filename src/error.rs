//! Unified error handling for the ytmeta crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`MetaErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use ytmeta::error::{Error, MetaErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{CommentError, FetchError, ParseError};

/// Common trait for all ytmeta error types
///
/// This trait provides a unified interface for error handling across
/// all modules, enabling consistent error processing strategies.
pub trait MetaErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short human-readable name of the category
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Parsing => "parse error",
            Self::Config => "configuration error",
            Self::Other => "other error",
        }
    }
}

impl MetaErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        self.is_transient()
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUrl(_) => ErrorCategory::Config,
            Self::Decode(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl MetaErrorTrait for ParseError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidVideoRef(_) => ErrorCategory::Config,
            _ => ErrorCategory::Parsing,
        }
    }
}

impl MetaErrorTrait for CommentError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::ResourceUnavailable(e) => e.is_transient(),
            Self::EndpointNotFound { .. } | Self::Configuration(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ResourceUnavailable(_) => ErrorCategory::Network,
            Self::EndpointNotFound { .. } => ErrorCategory::Parsing,
            Self::Configuration(_) => ErrorCategory::Config,
        }
    }
}

/// Unified error type for the ytmeta crate
#[derive(Error, Debug)]
pub enum Error {
    /// Comment fetch errors
    #[error("Comment error: {0}")]
    Comment(#[from] CommentError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl MetaErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Comment(e) => e.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Parse(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Http(_) => true, // HTTP errors are often transient
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Comment(e) => e.category(),
            Self::Fetch(e) => e.category(),
            Self::Parse(e) => e.category(),
            Self::Http(_) => ErrorCategory::Network,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
