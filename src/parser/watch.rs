//! Embedded JSON extraction from the watch page
//!
//! The host page ships two blobs inside inline scripts: the initial-state
//! tree (`ytInitialData`) and the client configuration (`ytcfg.set({...})`).

use scraper::{Html, Selector};
use serde_json::{Map, Value};

use crate::utils::error::ParseError;

const INITIAL_DATA_MARKERS: &[&str] = &[
    "var ytInitialData =",
    "window[\"ytInitialData\"] =",
    "ytInitialData =",
];

const YTCFG_MARKER: &str = "ytcfg.set(";

/// The two JSON blobs a comment fetch needs from the host page
#[derive(Debug, Clone)]
pub struct WatchPage {
    /// Initial-state tree
    pub initial_data: Value,
    /// Merged client configuration, if the page carried any
    pub ytcfg: Option<Value>,
}

impl WatchPage {
    /// Parse the host page
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InitialDataNotFound` when the page carries no
    /// initial-state object, and `ParseError::MalformedJson` when it does but
    /// the object cannot be parsed.
    pub fn parse(html: &str) -> Result<Self, ParseError> {
        let scripts = inline_scripts(html);

        let initial_data = extract_initial_data(&scripts)?;
        let ytcfg = match extract_ytcfg(&scripts) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable client configuration");
                None
            }
        };

        Ok(Self {
            initial_data,
            ytcfg,
        })
    }
}

/// Text of every inline script in the page
///
/// Falls back to the raw document when no script element is found, so bare
/// fragments still parse.
pub fn inline_scripts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let scripts: Vec<String> = match Selector::parse("script") {
        Ok(selector) => document
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .filter(|text| !text.trim().is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    if scripts.is_empty() {
        vec![html.to_string()]
    } else {
        scripts
    }
}

/// Find and parse the initial-state object
pub fn extract_initial_data(scripts: &[String]) -> Result<Value, ParseError> {
    for script in scripts {
        for marker in INITIAL_DATA_MARKERS {
            let Some(start) = script.find(marker) else {
                continue;
            };
            let rest = &script[start + marker.len()..];
            let Some(object) = balanced_object(rest) else {
                continue;
            };
            return serde_json::from_str(object).map_err(|e| ParseError::MalformedJson {
                name: "ytInitialData",
                reason: e.to_string(),
            });
        }
    }

    Err(ParseError::InitialDataNotFound)
}

/// Find every `ytcfg.set({...})` call and merge their objects
///
/// Later calls override keys of earlier ones. Returns `Ok(None)` when the
/// page has no such call.
pub fn extract_ytcfg(scripts: &[String]) -> Result<Option<Value>, ParseError> {
    let mut merged = Map::new();
    let mut found = false;

    for script in scripts {
        let mut rest = script.as_str();
        while let Some(start) = rest.find(YTCFG_MARKER) {
            rest = rest[start + YTCFG_MARKER.len()..].trim_start();
            // non-object calls such as ytcfg.set("KEY", value)
            let Some(object) = balanced_object(rest) else {
                continue;
            };
            let parsed: Value =
                serde_json::from_str(object).map_err(|e| ParseError::MalformedJson {
                    name: "ytcfg",
                    reason: e.to_string(),
                })?;
            if let Value::Object(map) = parsed {
                merged.extend(map);
                found = true;
            }
            rest = &rest[object.len()..];
        }
    }

    Ok(found.then_some(Value::Object(merged)))
}

/// Slice of the first balanced `{...}` at the start of `text`
///
/// Leading whitespace is allowed. Braces inside string literals are ignored.
fn balanced_object(text: &str) -> Option<&str> {
    let text = text.trim_start();
    if !text.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
