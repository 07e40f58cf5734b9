//! Structural helpers over the platform's untyped JSON
//!
//! The upstream payloads are versionless, so nothing here deserializes into
//! fixed structs. Lookups are by content shape: walk the tree, match keys,
//! and accept the several encodings a text field can take.

pub mod watch;

pub use watch::{extract_initial_data, extract_ytcfg, WatchPage};

use serde_json::Value;

/// Visitor decision for [`walk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Descend into the node's children
    Continue,
    /// Do not descend below this node
    Skip,
}

/// Depth-first pre-order walk over every node of a JSON tree
///
/// The visitor receives the key under which the node sits in its parent
/// object (`None` for the root and for array elements).
pub fn walk<'a, F>(value: &'a Value, visit: &mut F)
where
    F: FnMut(Option<&'a str>, &'a Value) -> WalkControl,
{
    walk_inner(None, value, visit);
}

fn walk_inner<'a, F>(key: Option<&'a str>, value: &'a Value, visit: &mut F)
where
    F: FnMut(Option<&'a str>, &'a Value) -> WalkControl,
{
    if visit(key, value) == WalkControl::Skip {
        return;
    }

    match value {
        Value::Object(map) => {
            for (child_key, child) in map {
                walk_inner(Some(child_key.as_str()), child, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_inner(None, item, visit);
            }
        }
        _ => {}
    }
}

/// Collect every value stored under `key`, anywhere in the tree
pub fn find_all<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    walk(value, &mut |_, node| {
        if let Some(hit) = node.get(key) {
            if node.is_object() {
                found.push(hit);
            }
        }
        WalkControl::Continue
    });
    found
}

/// Follow a path of object keys
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(*key))
}

/// String at a path of object keys
pub fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_path(value, path).and_then(Value::as_str)
}

/// Read a display-text field in any of its encodings
///
/// Handles plain strings, `{"simpleText": ..}`, `{"runs": [{"text": ..}, ..]}`
/// and `{"content": ..}`.
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            if let Some(simple) = map.get("simpleText").and_then(Value::as_str) {
                return Some(simple.to_string());
            }
            if let Some(runs) = map.get("runs").and_then(Value::as_array) {
                let text: String = runs
                    .iter()
                    .filter_map(|run| run.get("text").and_then(Value::as_str))
                    .collect();
                return Some(text);
            }
            map.get("content")
                .and_then(Value::as_str)
                .map(str::to_string)
        }
        _ => None,
    }
}

/// First continuation token anywhere below `value`
///
/// Recognizes the command form (`continuationCommand.token`) and the older
/// `nextContinuationData` / `reloadContinuationData` forms.
pub fn continuation_token_in(value: &Value) -> Option<String> {
    let mut token = None;
    walk(value, &mut |key, node| {
        if token.is_some() {
            return WalkControl::Skip;
        }
        token = match key {
            Some("continuationCommand") => node.get("token"),
            Some("nextContinuationData" | "reloadContinuationData") => node.get("continuation"),
            _ => None,
        }
        .and_then(Value::as_str)
        .map(str::to_string);
        WalkControl::Continue
    });
    token
}
