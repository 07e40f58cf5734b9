use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE,
    ORIGIN, REFERER, USER_AGENT,
};

/// Build browser-like headers for a watch page request
///
/// # Arguments
///
/// * `user_agent` - User agent string (typically a modern browser UA)
/// * `language` - Interface language, e.g. "en"
///
/// # Examples
///
/// ```
/// use ytmeta::crawler::headers::build_page_headers;
///
/// let headers = build_page_headers(
///     "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
///     "en",
/// );
/// assert!(headers.contains_key("accept-language"));
/// ```
pub fn build_page_headers(user_agent: &str, language: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    insert_language(&mut headers, language);
    headers.insert(
        ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate"),
    );

    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );

    headers
}

/// Build headers for an internal API request
///
/// # Arguments
///
/// * `user_agent` - User agent string
/// * `language` - Interface language
/// * `origin` - Platform origin, sent as both origin and referer
pub fn build_api_headers(user_agent: &str, language: &str, origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    insert_language(&mut headers, language);

    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ORIGIN, value.clone());
        headers.insert(REFERER, value);
    }

    headers
}

fn insert_language(headers: &mut HeaderMap, language: &str) {
    let value = format!("{language},{language}-US;q=0.9,en;q=0.8");
    let value = HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ACCEPT_LANGUAGE, value);
}
