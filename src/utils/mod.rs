//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").to_string()
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Short form of an opaque continuation token, for log fields
pub fn token_preview(token: &str) -> String {
    truncate_text(token, 24)
}
