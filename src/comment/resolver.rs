//! Endpoint resolution
//!
//! Finds the first continuation token of each sort order. The strategies run
//! in order and each one reports either a map of tokens or a reason to move
//! on; the first map containing the requested sort order wins.
//!
//! 1. Sort-menu shape search over the initial-state tree
//! 2. A comment item section carrying its own token (default sort only)
//! 3. One probe request whose response is searched like (1)

use serde_json::Value;
use std::collections::HashMap;

use crate::crawler::{ClientContext, Transport};
use crate::models::SortOrder;
use crate::parser::{continuation_token_in, str_at, text_of, walk, WalkControl};
use crate::utils::error::CommentError;
use crate::utils::token_preview;

const TOP_WORDS: &[&str] = &["top", "popular", "best", "relevant"];
const RECENT_WORDS: &[&str] = &["newest", "new", "recent", "latest"];
const LABEL_FIELDS: &[&str] = &["title", "text", "label"];

/// Initial continuation token per sort order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMap {
    tokens: HashMap<SortOrder, String>,
}

impl EndpointMap {
    pub fn insert(&mut self, sort: SortOrder, token: String) {
        self.tokens.entry(sort).or_insert(token);
    }

    pub fn get(&self, sort: SortOrder) -> Option<&str> {
        self.tokens.get(&sort).map(String::as_str)
    }

    pub fn contains(&self, sort: SortOrder) -> bool {
        self.tokens.contains_key(&sort)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// Outcome of one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(EndpointMap),
    Continue(&'static str),
}

impl Resolution {
    /// Accept only maps that cover `sort`
    fn covering(self, sort: SortOrder) -> Self {
        match self {
            Self::Found(map) if !map.contains(sort) => {
                Self::Continue("endpoint map does not cover the requested sort order")
            }
            other => other,
        }
    }
}

/// Resolve the first token for `sort`
///
/// # Errors
///
/// `EndpointNotFound` when no strategy yields a token for `sort`, and
/// `ResourceUnavailable` when the probe request itself fails.
pub async fn resolve(
    initial_data: &Value,
    sort: SortOrder,
    transport: &dyn Transport,
    client: &ClientContext,
) -> Result<String, CommentError> {
    let local: [(&str, fn(&Value) -> Resolution); 2] = [
        ("sort_menu", from_sort_menu),
        ("item_section", from_item_section),
    ];

    for (strategy, run) in local {
        match run(initial_data).covering(sort) {
            Resolution::Found(map) => return found(strategy, &map, sort),
            Resolution::Continue(reason) => {
                tracing::debug!(strategy, %sort, reason, "Resolver strategy failed");
            }
        }
    }

    let Some(probe) = probe_token(initial_data) else {
        tracing::warn!(%sort, "No comment endpoint and nothing to probe");
        return Err(CommentError::EndpointNotFound { sort });
    };

    tracing::debug!(token = %token_preview(&probe), "Probing for the sort menu");
    let response = transport
        .fetch_continuation(&probe, client)
        .await
        .map_err(CommentError::ResourceUnavailable)?;

    match from_sort_menu(&response).covering(sort) {
        Resolution::Found(map) => found("probe", &map, sort),
        Resolution::Continue(reason) => {
            tracing::warn!(%sort, reason, "All resolver strategies failed");
            Err(CommentError::EndpointNotFound { sort })
        }
    }
}

fn found(strategy: &str, map: &EndpointMap, sort: SortOrder) -> Result<String, CommentError> {
    tracing::info!(strategy, %sort, sort_orders = map.len(), "Resolved comment endpoint");
    map.get(sort)
        .map(str::to_string)
        .ok_or(CommentError::EndpointNotFound { sort })
}

// ============================================================================
// Strategy 1: sort menu shape search
// ============================================================================

/// Find any array of labelled, token-carrying items that looks like a sort
/// menu, wherever it sits in the tree
pub fn from_sort_menu(tree: &Value) -> Resolution {
    let mut result = None;

    walk(tree, &mut |key, node| {
        if result.is_some() {
            return WalkControl::Skip;
        }
        let Some(items) = node.as_array() else {
            return WalkControl::Continue;
        };
        match menu_from_items(key, items) {
            Some(map) => {
                result = Some(map);
                WalkControl::Skip
            }
            None => WalkControl::Continue,
        }
    });

    match result {
        Some(map) => Resolution::Found(map),
        None => Resolution::Continue("no sort menu in tree"),
    }
}

fn menu_from_items(key: Option<&str>, items: &[Value]) -> Option<EndpointMap> {
    if items.is_empty() {
        return None;
    }

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let label = LABEL_FIELDS
            .iter()
            .find_map(|field| item.get(*field).and_then(text_of))?;
        let token = continuation_token_in(item)?;
        entries.push((classify_label(&label), token));
    }

    let in_menu = key.is_some_and(|k| k.contains("menu") || k.contains("Menu"));
    if !in_menu && entries.iter().all(|(sort, _)| sort.is_none()) {
        return None;
    }

    let mut map = EndpointMap::default();
    for (sort, token) in &entries {
        if let Some(sort) = sort {
            map.insert(*sort, token.clone());
        }
    }
    // Unlabelled entries fall back to menu position
    for (position, (sort, token)) in entries.into_iter().enumerate() {
        if sort.is_none() {
            if let Some(&by_position) = SortOrder::all().get(position) {
                map.insert(by_position, token);
            }
        }
    }

    (!map.is_empty()).then_some(map)
}

/// Map a menu label to a sort order by its words
pub fn classify_label(label: &str) -> Option<SortOrder> {
    let lowered = label.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| TOP_WORDS.contains(w)) {
        Some(SortOrder::Top)
    } else if words.iter().any(|w| RECENT_WORDS.contains(w)) {
        Some(SortOrder::Recent)
    } else {
        None
    }
}

// ============================================================================
// Strategy 2: item section with its own token
// ============================================================================

/// Token of the comment item section, offered as the default sort only
pub fn from_item_section(tree: &Value) -> Resolution {
    match comment_section_token(tree) {
        Some(token) => {
            let mut map = EndpointMap::default();
            map.insert(SortOrder::Top, token);
            Resolution::Found(map)
        }
        None => Resolution::Continue("no item section with a continuation token"),
    }
}

/// Token of the best item section: one identified as the comment section,
/// else the first unidentified one
fn comment_section_token(tree: &Value) -> Option<String> {
    let mut identified = None;
    let mut anonymous = None;

    walk(tree, &mut |key, node| {
        if key != Some("itemSectionRenderer") {
            return WalkControl::Continue;
        }
        match str_at(node, &["sectionIdentifier"]) {
            Some(id) if id.contains("comment") => {
                if identified.is_none() {
                    identified = continuation_token_in(node);
                }
            }
            Some(_) => {}
            None => {
                if anonymous.is_none() {
                    anonymous = continuation_token_in(node);
                }
            }
        }
        WalkControl::Skip
    });

    identified.or(anonymous)
}

// ============================================================================
// Strategy 3: probe request
// ============================================================================

/// Token whose response should carry the sort menu
///
/// The comments engagement panel first, the comment item section second.
pub fn probe_token(tree: &Value) -> Option<String> {
    let mut panel_token = None;

    walk(tree, &mut |key, node| {
        if panel_token.is_some() {
            return WalkControl::Skip;
        }
        if key != Some("engagementPanelSectionListRenderer") {
            return WalkControl::Continue;
        }
        let is_comments = str_at(node, &["panelIdentifier"])
            .or_else(|| str_at(node, &["targetId"]))
            .is_some_and(|id| id.contains("comment"));
        if is_comments {
            panel_token = continuation_token_in(node);
        }
        WalkControl::Skip
    });

    panel_token.or_else(|| comment_section_token(tree))
}
