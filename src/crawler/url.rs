//! Video reference parsing
//!
//! Accepts either a bare video id or any of the common URL shapes pointing at
//! a video, and reduces them to the 11-character id.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::utils::error::ParseError;

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Path prefixes that are followed by a video id
const ID_PATH_PREFIXES: &[&str] = &["shorts", "embed", "live", "v"];

/// Check whether a string is a well-formed video id
pub fn is_video_id(candidate: &str) -> bool {
    VIDEO_ID_REGEX.is_match(candidate)
}

/// Extract the video id from a bare id or a video URL
///
/// Supported forms:
/// - `dQw4w9WgXcQ`
/// - `https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42`
/// - `https://youtu.be/dQw4w9WgXcQ`
/// - `https://www.youtube.com/shorts/dQw4w9WgXcQ` (also `embed/`, `live/`)
///
/// # Examples
///
/// ```
/// use ytmeta::crawler::url::extract_video_id;
///
/// let id = extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap();
/// assert_eq!(id, "dQw4w9WgXcQ");
/// ```
pub fn extract_video_id(reference: &str) -> Result<String, ParseError> {
    let reference = reference.trim();

    if is_video_id(reference) {
        return Ok(reference.to_string());
    }

    let invalid = || ParseError::InvalidVideoRef(reference.to_string());

    let url = Url::parse(reference).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?.to_lowercase();

    let candidate = if host == "youtu.be" {
        url.path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        let from_query = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned());

        from_query.or_else(|| {
            let segments: Vec<&str> = url.path_segments()?.collect();
            match segments.as_slice() {
                [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) => Some(id.to_string()),
                _ => None,
            }
        })
    } else {
        None
    };

    candidate.filter(|id| is_video_id(id)).ok_or_else(invalid)
}
