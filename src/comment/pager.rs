//! Pagination driver
//!
//! [`PageState`] is the synchronous state machine: it owns the token, the
//! counters and the seen-id set and decides, record by record, whether to
//! emit, skip or stop. [`drive`] wraps it in an async stream that performs
//! the network exchanges, one page at a time and only when pulled.

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

use super::normalize::{NormalizeContext, Normalizer};
use super::payload;
use super::resolver;
use super::{CommentStream, ProgressCallback};
use crate::crawler::{ClientContext, Transport};
use crate::models::{CommentRecord, SortOrder};
use crate::parser::WatchPage;
use crate::utils::error::{CommentError, ParseError};
use crate::utils::token_preview;

/// Phase of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePhase {
    Resolving,
    Fetching,
    Extracting,
    Emitting,
    Done,
    Failed,
}

/// Per-record decision of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Hand the record to the caller
    Emit,
    /// Drop the record and continue with the next one
    Skip,
    /// Drop the record and end the fetch
    Stop,
}

/// Counters reported when a fetch ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub pages: usize,
    pub emitted: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

/// Fetch-local pagination state
///
/// Created at fetch start, never shared, dropped with the stream.
#[derive(Debug, Clone)]
pub struct PageState {
    token: Option<String>,
    sort: SortOrder,
    limit: Option<usize>,
    cutoff: Option<NaiveDate>,
    seen: HashSet<String>,
    used_tokens: HashSet<String>,
    phase: PagePhase,
    fetched_at: DateTime<Utc>,
    stats: FetchStats,
}

impl PageState {
    /// State for a fetch that still has to resolve its first token
    pub fn new(sort: SortOrder, limit: Option<usize>, cutoff: Option<NaiveDate>) -> Self {
        Self {
            token: None,
            sort,
            limit,
            cutoff,
            seen: HashSet::new(),
            used_tokens: HashSet::new(),
            phase: PagePhase::Resolving,
            fetched_at: Utc::now(),
            stats: FetchStats::default(),
        }
    }

    /// State seeded directly at fetching with a known token
    pub fn seeded(token: String, sort: SortOrder, limit: Option<usize>) -> Self {
        let mut state = Self::new(sort, limit, None);
        state.begin(token);
        state
    }

    /// Anchor all relative dates of this fetch to `now`
    #[must_use]
    pub fn anchored_at(mut self, now: DateTime<Utc>) -> Self {
        self.fetched_at = now;
        self
    }

    /// Install the resolved first token
    pub fn begin(&mut self, token: String) {
        self.token = Some(token);
        self.phase = PagePhase::Fetching;
    }

    /// Take the token for the next request
    ///
    /// Returns `None` and finishes the fetch when there is no token left or
    /// the upstream handed back a token this fetch already used.
    pub fn next_request(&mut self) -> Option<String> {
        if self.is_finished() {
            return None;
        }
        let Some(token) = self.token.take() else {
            self.phase = PagePhase::Done;
            return None;
        };
        if !self.used_tokens.insert(token.clone()) {
            tracing::warn!(
                token = %token_preview(&token),
                "Continuation token repeated, ending fetch"
            );
            self.phase = PagePhase::Done;
            return None;
        }
        self.phase = PagePhase::Fetching;
        Some(token)
    }

    /// Record a received page and the token it points to
    pub fn page_received(&mut self, next_token: Option<String>) {
        self.stats.pages += 1;
        self.token = next_token;
        self.phase = PagePhase::Extracting;
    }

    /// Decide what to do with one normalized record
    pub fn admit(&mut self, record: &CommentRecord) -> Admission {
        if self.is_finished() {
            return Admission::Stop;
        }
        self.phase = PagePhase::Emitting;

        if self.seen.contains(&record.id) {
            self.stats.duplicates += 1;
            return Admission::Skip;
        }

        if let (Some(cutoff), Some(date)) = (self.cutoff, record.publish_date) {
            if date < cutoff {
                tracing::debug!(
                    comment_id = %record.id,
                    %date,
                    %cutoff,
                    "Reached date cutoff"
                );
                self.phase = PagePhase::Done;
                return Admission::Stop;
            }
        }

        self.seen.insert(record.id.clone());
        self.stats.emitted += 1;

        if self.limit.is_some_and(|limit| self.stats.emitted >= limit) {
            self.phase = PagePhase::Done;
        }
        Admission::Emit
    }

    /// Close out the current page
    pub fn page_finished(&mut self, malformed: usize) {
        self.stats.malformed += malformed;
        if self.is_finished() {
            return;
        }
        self.phase = if self.token.is_some() {
            PagePhase::Fetching
        } else {
            PagePhase::Done
        };
    }

    pub fn fail(&mut self) {
        self.phase = PagePhase::Failed;
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, PagePhase::Done | PagePhase::Failed)
    }

    pub fn phase(&self) -> PagePhase {
        self.phase
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn emitted(&self) -> usize {
        self.stats.emitted
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }
}

/// Where a fetch starts
pub enum Origin {
    /// Resolve the first token from the video's host page
    Video(String),
    /// Start directly from a known token
    Token,
}

/// Everything the stream carries between polls
pub struct Driver {
    transport: Arc<dyn Transport>,
    client: ClientContext,
    origin: Origin,
    state: PageState,
    context: NormalizeContext,
    current: Option<Normalizer>,
    progress: Option<ProgressCallback>,
}

impl Driver {
    pub fn new(
        transport: Arc<dyn Transport>,
        client: ClientContext,
        origin: Origin,
        state: PageState,
        context: NormalizeContext,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            transport,
            client,
            origin,
            state,
            context,
            current: None,
            progress,
        }
    }

    /// Pull the next record, fetching pages as needed
    async fn next_record(&mut self) -> Result<Option<CommentRecord>, CommentError> {
        loop {
            if self.state.is_finished() {
                return Ok(None);
            }

            if self.state.phase() == PagePhase::Resolving {
                let token = self.resolve().await.inspect_err(|_| self.state.fail())?;
                self.state.begin(token);
                continue;
            }

            if let Some(normalizer) = self.current.as_mut() {
                match normalizer.next() {
                    Some(record) => match self.state.admit(&record) {
                        Admission::Emit => {
                            if let Some(progress) = self.progress.as_mut() {
                                progress(self.state.emitted());
                            }
                            return Ok(Some(record));
                        }
                        Admission::Skip => continue,
                        Admission::Stop => return Ok(None),
                    },
                    None => {
                        let malformed = normalizer.skipped();
                        self.current = None;
                        self.state.page_finished(malformed);
                        continue;
                    }
                }
            }

            let Some(token) = self.state.next_request() else {
                return Ok(None);
            };

            tracing::debug!(
                sort = %self.state.sort(),
                token = %token_preview(&token),
                "Fetching comment page"
            );

            let response = match self.transport.fetch_continuation(&token, &self.client).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, "Comment page request failed");
                    self.state.fail();
                    return Err(CommentError::ResourceUnavailable(e));
                }
            };

            let payloads = payload::extract(&response);
            self.state.page_received(payloads.next_token.clone());
            self.current = Some(Normalizer::new(payloads, self.context.clone()));
        }
    }

    /// Download the host page and resolve the first token for the sort order
    async fn resolve(&mut self) -> Result<String, CommentError> {
        let Origin::Video(video_id) = &self.origin else {
            return Err(CommentError::config("no token to start the fetch from"));
        };
        let sort = self.state.sort();

        tracing::info!(video_id = %video_id, sort = %sort, "Resolving comment endpoint");

        let html = self
            .transport
            .fetch_watch_page(video_id)
            .await
            .map_err(CommentError::ResourceUnavailable)?;

        let page = WatchPage::parse(&html).map_err(|e| {
            match &e {
                ParseError::InitialDataNotFound => {
                    tracing::warn!(video_id = %video_id, "Host page has no initial data");
                }
                other => tracing::warn!(video_id = %video_id, error = %other, "Unreadable host page"),
            }
            CommentError::EndpointNotFound { sort }
        })?;

        if let Some(ytcfg) = &page.ytcfg {
            self.client = ClientContext::from_ytcfg(ytcfg);
        }

        resolver::resolve(&page.initial_data, sort, self.transport.as_ref(), &self.client).await
    }

    fn finish(&self) {
        let stats = self.state.stats();
        tracing::info!(
            sort = %self.state.sort(),
            pages = stats.pages,
            emitted = stats.emitted,
            duplicates = stats.duplicates,
            malformed = stats.malformed,
            failed = self.state.phase() == PagePhase::Failed,
            "Comment fetch finished"
        );
    }
}

/// Turn a driver into a lazy stream of records
///
/// Nothing is requested until the stream is polled. The stream ends after
/// the first error; dropping it cancels the fetch.
pub fn drive(driver: Driver) -> CommentStream {
    stream::try_unfold(driver, |mut driver| async move {
        match driver.next_record().await {
            Ok(Some(record)) => Ok(Some((record, driver))),
            Ok(None) => {
                driver.finish();
                Ok(None)
            }
            Err(e) => {
                driver.finish();
                Err(e)
            }
        }
    })
    .boxed()
}
