//! Joining payload tables into finished comment records

use chrono::{DateTime, Utc};

use super::payload::{AuthorPayload, PagePayloads, ToolbarPayload};
use super::values::resolve_publish_time;
use crate::models::CommentRecord;

/// What kind of continuation chain a page belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A top-level comment page
    TopLevel,
    /// A page of one thread's replies
    ///
    /// With an explicit parent every record is attached to it; otherwise the
    /// parent is read from the reply id.
    Replies { parent: Option<String> },
}

/// Fetch-wide inputs to normalization
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    /// Anchor for relative times, fixed at fetch start
    pub now: DateTime<Utc>,
    pub scope: Scope,
    /// Carry reply continuation tokens on top-level records
    pub keep_reply_tokens: bool,
}

impl NormalizeContext {
    pub fn top_level(now: DateTime<Utc>, keep_reply_tokens: bool) -> Self {
        Self {
            now,
            scope: Scope::TopLevel,
            keep_reply_tokens,
        }
    }

    pub fn replies(now: DateTime<Utc>, parent: Option<String>) -> Self {
        Self {
            now,
            scope: Scope::Replies { parent },
            keep_reply_tokens: false,
        }
    }
}

/// Lazy sequence of records for one page
///
/// Owns the page's payloads and builds one record per `next()` call, in the
/// order comments first appeared in the response.
pub struct Normalizer {
    payloads: PagePayloads,
    context: NormalizeContext,
    cursor: usize,
    skipped: usize,
}

impl Normalizer {
    pub fn new(payloads: PagePayloads, context: NormalizeContext) -> Self {
        Self {
            payloads,
            context,
            cursor: 0,
            skipped: 0,
        }
    }

    /// Number of malformed entries skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn build(&self, id: &str) -> Option<CommentRecord> {
        let comment = self.payloads.comments.get(id)?;

        if id.is_empty() {
            tracing::warn!("Skipping comment without id");
            return None;
        }
        let Some(text) = comment.text.clone() else {
            tracing::warn!(comment_id = %id, "Skipping comment without text");
            return None;
        };

        let author = self.payloads.authors.get(id).cloned().unwrap_or_else(|| {
            tracing::debug!(comment_id = %id, "No author payload, using placeholders");
            AuthorPayload::default()
        });
        let toolbar = self
            .payloads
            .toolbars
            .get(id)
            .cloned()
            .unwrap_or_else(ToolbarPayload::default);

        let (is_reply, parent_id) = match &self.context.scope {
            Scope::TopLevel => {
                let structural = comment.parent_key.is_some()
                    || comment.reply_level.is_some_and(|level| level > 0)
                    || id.contains('.');
                let parent = structural
                    .then(|| comment.parent_key.clone().or_else(|| parent_from_id(id)))
                    .flatten();
                (structural, parent)
            }
            Scope::Replies { parent } => (
                true,
                parent
                    .clone()
                    .or_else(|| comment.parent_key.clone())
                    .or_else(|| parent_from_id(id)),
            ),
        };

        if is_reply {
            match parent_id.as_deref() {
                None => {
                    tracing::warn!(comment_id = %id, "Skipping reply with unknown parent");
                    return None;
                }
                Some(parent) if parent == id => {
                    tracing::debug!(comment_id = %id, "Skipping parent comment on reply page");
                    return None;
                }
                Some(_) => {}
            }
        }

        let time_human = comment.time_human.clone().unwrap_or_default();
        let (publish_date, time_parsed) =
            resolve_publish_time(comment.machine_time.as_ref(), &time_human, self.context.now);

        let reply_continuation_token = if self.context.keep_reply_tokens && !is_reply {
            toolbar.reply_token.clone()
        } else {
            None
        };

        Some(CommentRecord {
            id: id.to_string(),
            text,
            author: author.name.unwrap_or_default(),
            author_channel_id: author.channel_id.unwrap_or_default(),
            author_avatar_url: author.avatar_url.unwrap_or_default(),
            like_count: toolbar.like_count.unwrap_or(0),
            reply_count: if is_reply {
                0
            } else {
                toolbar.reply_count.unwrap_or(0)
            },
            is_reply,
            parent_id: if is_reply { parent_id } else { None },
            is_hearted: toolbar.is_hearted.unwrap_or(false),
            is_pinned: comment.is_pinned.unwrap_or(false),
            author_badges: author.badges,
            paid_comment: comment.paid_comment.clone(),
            publish_date,
            time_human,
            time_parsed,
            reply_continuation_token,
        })
    }
}

impl Iterator for Normalizer {
    type Item = CommentRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.payloads.comments.ids().get(self.cursor) {
            let id = id.clone();
            self.cursor += 1;
            match self.build(&id) {
                Some(record) => return Some(record),
                None => self.skipped += 1,
            }
        }
        None
    }
}

/// Parent comment id encoded in a reply id (`<parent>.<suffix>`)
pub fn parent_from_id(id: &str) -> Option<String> {
    id.split_once('.')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
        .map(str::to_string)
}
