// Core data structures for ytmeta

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comment ordering offered by the platform, each with its own continuation chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Engagement-ranked
    #[default]
    Top,
    /// Time-ranked, newest first
    Recent,
}

impl SortOrder {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Recent => "recent",
        }
    }

    /// All sort orders in menu order
    pub fn all() -> [Self; 2] {
        [Self::Top, Self::Recent]
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" | "popular" => Ok(Self::Top),
            "recent" | "new" | "newest" => Ok(Self::Recent),
            other => Err(format!("unknown sort order '{other}' (expected top or recent)")),
        }
    }
}

/// One fully-normalized comment or reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommentRecord {
    /// Platform-assigned id, unique per comment/reply
    pub id: String,
    pub text: String,

    pub author: String,
    pub author_channel_id: String,
    pub author_avatar_url: String,

    pub like_count: u64,
    /// Always 0 for replies
    pub reply_count: u64,

    pub is_reply: bool,
    /// Present only when `is_reply`
    pub parent_id: Option<String>,

    #[serde(default)]
    pub is_hearted: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub author_badges: Vec<String>,

    /// Paid comment chip text, if the comment was paid for
    #[serde(default)]
    pub paid_comment: Option<String>,

    pub publish_date: Option<NaiveDate>,
    /// Relative time as shown by the platform, e.g. "2 years ago"
    pub time_human: String,
    /// Best-effort unix timestamp in seconds
    pub time_parsed: Option<i64>,

    /// Token for the undisplayed replies of this thread
    pub reply_continuation_token: Option<String>,
}

impl CommentRecord {
    /// Check if this is a top-level comment (not a reply)
    pub fn is_top_level(&self) -> bool {
        !self.is_reply
    }

    /// Check if this comment has replies that can be fetched on demand
    pub fn has_replies(&self) -> bool {
        self.reply_count > 0 || self.reply_continuation_token.is_some()
    }
}
