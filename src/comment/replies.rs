//! On-demand reply fetching for a single thread

use chrono::Utc;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

use super::normalize::NormalizeContext;
use super::pager::{drive, Driver, Origin, PageState};
use super::{CommentStream, ReplyQuery};
use crate::crawler::{ClientContext, Transport};
use crate::models::SortOrder;
use crate::utils::error::CommentError;
use crate::utils::token_preview;

static REPLY_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-%=]{16,}$").unwrap());

/// Reject tokens that cannot be continuation tokens
///
/// Tokens are URL-safe base64, possibly percent-encoded, and never short.
pub fn validate_reply_token(token: &str) -> Result<(), CommentError> {
    if REPLY_TOKEN_REGEX.is_match(token) {
        Ok(())
    } else {
        Err(CommentError::config(format!(
            "malformed reply continuation token '{}'",
            token_preview(token)
        )))
    }
}

/// Build the reply stream for one thread
///
/// The pager starts directly at fetching; there is no endpoint to resolve.
pub(crate) fn stream(
    transport: Arc<dyn Transport>,
    client: ClientContext,
    token: &str,
    query: ReplyQuery,
) -> Result<CommentStream, CommentError> {
    validate_reply_token(token)?;
    query.validate()?;

    let ReplyQuery {
        limit,
        parent_id,
        progress,
    } = query;

    tracing::debug!(
        token = %token_preview(token),
        parent_id = parent_id.as_deref().unwrap_or(""),
        "Starting reply fetch"
    );

    let now = Utc::now();
    let state = PageState::seeded(token.to_string(), SortOrder::Top, limit).anchored_at(now);
    let context = NormalizeContext::replies(now, parent_id);

    Ok(drive(Driver::new(
        transport,
        client,
        Origin::Token,
        state,
        context,
        progress,
    )))
}
