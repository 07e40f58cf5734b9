//! ytmeta - video platform metadata extraction
//!
//! A comment extraction engine for a large video-sharing platform. It reads
//! the undocumented JSON embedded in, or returned by, the platform's web
//! pages and turns it into a typed, deduplicated stream of comments.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Transport boundary and the rate-limited HTTP transport
//! - [`parser`] - Host page and JSON structure helpers
//! - [`comment`] - Endpoint resolution, pagination, payload joins, replies
//! - [`models`] - Core data structures and types
//! - [`error`] - Unified error handling
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use std::sync::Arc;
//! use ytmeta::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let transport = Arc::new(YoutubeFetcher::from_config(&config.fetcher)?);
//!     let fetcher = CommentFetcher::new(transport);
//!
//!     let mut comments = fetcher.fetch_comments("dQw4w9WgXcQ", CommentQuery::new().limit(20))?;
//!     while let Some(comment) = comments.next().await {
//!         println!("{}", comment?.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod comment;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::comment::{
        CommentFetcher, CommentQuery, CommentStream, ProgressCallback, ReplyQuery,
    };
    pub use crate::config::Config;
    pub use crate::crawler::fetcher::YoutubeFetcher;
    pub use crate::crawler::{ClientContext, Transport};
    pub use crate::error::{Error, ErrorCategory, MetaErrorTrait, Result};
    pub use crate::models::{CommentRecord, SortOrder};
}

// Direct re-exports for convenience
pub use comment::{CommentFetcher, CommentQuery, ReplyQuery};
pub use models::{CommentRecord, SortOrder};
