//! Comment extraction engine
//!
//! This module turns a video reference into a lazy, deduplicated stream of
//! [`CommentRecord`]s:
//!
//! - [`resolver`] finds the first continuation token of a sort order
//! - [`pager`] exchanges tokens for pages and applies limit, cutoff and dedup
//! - [`payload`] pulls the comment, author and toolbar tables out of a page
//! - [`normalize`] joins those tables into records
//! - [`replies`] fetches one thread's replies on demand
//!
//! # Example
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use std::sync::Arc;
//! use ytmeta::comment::{CommentFetcher, CommentQuery};
//! use ytmeta::crawler::fetcher::YoutubeFetcher;
//! use ytmeta::models::SortOrder;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(YoutubeFetcher::new(2)?);
//! let fetcher = CommentFetcher::new(transport);
//!
//! let query = CommentQuery::new().sort(SortOrder::Recent).limit(50);
//! let comments: Vec<_> = fetcher
//!     .fetch_comments("dQw4w9WgXcQ", query)?
//!     .try_collect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod normalize;
pub mod pager;
pub mod payload;
pub mod replies;
pub mod resolver;
pub mod tree;
pub mod values;

use chrono::{NaiveDate, Utc};
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;

use crate::crawler::url::extract_video_id;
use crate::crawler::{ClientContext, Transport};
use crate::models::{CommentRecord, SortOrder};
use crate::utils::error::CommentError;
use normalize::NormalizeContext;
use pager::{drive, Driver, Origin, PageState};

/// Lazy sequence of records; ends after the first error
pub type CommentStream = BoxStream<'static, Result<CommentRecord, CommentError>>;

/// Called once per emitted record with the running total
pub type ProgressCallback = Box<dyn FnMut(usize) + Send>;

/// Parameters of a top-level comment fetch
#[derive(Default)]
pub struct CommentQuery {
    pub sort: SortOrder,
    pub limit: Option<usize>,
    /// Stop at the first comment published before this date
    pub since: Option<NaiveDate>,
    pub progress: Option<ProgressCallback>,
}

impl CommentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: impl FnMut(usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Check the parameter combination
    ///
    /// A date cutoff only makes sense when comments arrive newest first.
    pub fn validate(&self) -> Result<(), CommentError> {
        if self.since.is_some() && self.sort != SortOrder::Recent {
            return Err(CommentError::config(format!(
                "since_date requires sort order 'recent', got '{}'",
                self.sort
            )));
        }
        validate_limit(self.limit)
    }
}

impl fmt::Debug for CommentQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentQuery")
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("since", &self.since)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Parameters of a reply fetch
#[derive(Default)]
pub struct ReplyQuery {
    pub limit: Option<usize>,
    /// Attach every reply to this comment instead of reading the parent
    /// from each reply id
    pub parent_id: Option<String>,
    pub progress: Option<ProgressCallback>,
}

impl ReplyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: impl FnMut(usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn validate(&self) -> Result<(), CommentError> {
        validate_limit(self.limit)
    }
}

impl fmt::Debug for ReplyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyQuery")
            .field("limit", &self.limit)
            .field("parent_id", &self.parent_id)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

fn validate_limit(limit: Option<usize>) -> Result<(), CommentError> {
    match limit {
        Some(0) => Err(CommentError::config("limit must be a positive integer")),
        _ => Ok(()),
    }
}

/// Entry point of the engine
///
/// Holds only the injected transport and a fallback client context, so one
/// fetcher can serve any number of concurrent fetches.
#[derive(Clone)]
pub struct CommentFetcher {
    transport: Arc<dyn Transport>,
    client: ClientContext,
}

impl CommentFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            client: ClientContext::default(),
        }
    }

    /// Client context used when the host page carries none, and for replies
    #[must_use]
    pub fn with_client_context(mut self, client: ClientContext) -> Self {
        self.client = client;
        self
    }

    /// Stream the comments of a video
    ///
    /// Parameters are checked here, before any request. The stream itself is
    /// lazy: the host page is only downloaded when it is first polled.
    ///
    /// # Errors
    ///
    /// `CommentError::Configuration` for an invalid video reference or
    /// parameter combination.
    pub fn fetch_comments(
        &self,
        video: &str,
        query: CommentQuery,
    ) -> Result<CommentStream, CommentError> {
        self.top_level(video, query, false)
    }

    /// Like [`fetch_comments`](Self::fetch_comments), with reply continuation
    /// tokens kept on every record that has hidden replies
    pub fn fetch_comments_with_reply_tokens(
        &self,
        video: &str,
        query: CommentQuery,
    ) -> Result<CommentStream, CommentError> {
        self.top_level(video, query, true)
    }

    /// Stream the replies behind one reply continuation token
    ///
    /// # Errors
    ///
    /// `CommentError::Configuration` for a malformed token or limit.
    pub fn fetch_replies(
        &self,
        token: &str,
        query: ReplyQuery,
    ) -> Result<CommentStream, CommentError> {
        replies::stream(
            Arc::clone(&self.transport),
            self.client.clone(),
            token,
            query,
        )
    }

    /// Stream the replies of a record fetched with reply tokens
    ///
    /// Every reply is attached to `comment.id`.
    pub fn fetch_replies_for(
        &self,
        comment: &CommentRecord,
        query: ReplyQuery,
    ) -> Result<CommentStream, CommentError> {
        let token = comment.reply_continuation_token.as_deref().ok_or_else(|| {
            CommentError::config(format!(
                "comment '{}' carries no reply continuation token",
                comment.id
            ))
        })?;
        self.fetch_replies(token, query.parent(comment.id.clone()))
    }

    fn top_level(
        &self,
        video: &str,
        query: CommentQuery,
        keep_reply_tokens: bool,
    ) -> Result<CommentStream, CommentError> {
        query.validate()?;
        let video_id =
            extract_video_id(video).map_err(|e| CommentError::config(e.to_string()))?;

        let CommentQuery {
            sort,
            limit,
            since,
            progress,
        } = query;

        let now = Utc::now();
        let state = PageState::new(sort, limit, since).anchored_at(now);
        let context = NormalizeContext::top_level(now, keep_reply_tokens);

        Ok(drive(Driver::new(
            Arc::clone(&self.transport),
            self.client.clone(),
            Origin::Video(video_id),
            state,
            context,
            progress,
        )))
    }
}
