//! Payload extraction from one continuation response
//!
//! A response interleaves up to three comment architectures: the legacy
//! inline `commentRenderer`, the `commentViewModel` reference objects, and
//! the entity payloads under `frameworkUpdates` mutations. Each is read into
//! its own table keyed by comment id. The normalizer joins the tables later.
//!
//! Tables merge first-wins per field, so the order in which families are fed
//! in decides precedence: legacy text beats entity text, entity engagement
//! counts beat legacy vote strings.

use serde_json::Value;
use std::collections::HashMap;

use super::values::parse_count;
use crate::parser::{continuation_token_in, get_path, str_at, text_of, walk, WalkControl};

/// First-wins field merge between two partial payloads of the same comment
pub trait Merge {
    /// Fill every field still unset in `self` from `other`
    fn merge(&mut self, other: Self);
}

fn fill<T>(slot: &mut Option<T>, other: Option<T>) {
    if slot.is_none() {
        *slot = other;
    }
}

/// Content fields of a comment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentPayload {
    pub text: Option<String>,
    pub time_human: Option<String>,
    pub machine_time: Option<Value>,
    /// Structural nesting marker, 0 for top-level comments
    pub reply_level: Option<u64>,
    /// Id of the parent comment, present only on replies
    pub parent_key: Option<String>,
    pub is_pinned: Option<bool>,
    pub paid_comment: Option<String>,
}

impl Merge for CommentPayload {
    fn merge(&mut self, other: Self) {
        fill(&mut self.text, other.text);
        fill(&mut self.time_human, other.time_human);
        fill(&mut self.machine_time, other.machine_time);
        fill(&mut self.reply_level, other.reply_level);
        fill(&mut self.parent_key, other.parent_key);
        fill(&mut self.is_pinned, other.is_pinned);
        fill(&mut self.paid_comment, other.paid_comment);
    }
}

/// Author identity of a comment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorPayload {
    pub name: Option<String>,
    pub channel_id: Option<String>,
    pub avatar_url: Option<String>,
    pub badges: Vec<String>,
}

impl Merge for AuthorPayload {
    fn merge(&mut self, other: Self) {
        fill(&mut self.name, other.name);
        fill(&mut self.channel_id, other.channel_id);
        fill(&mut self.avatar_url, other.avatar_url);
        if self.badges.is_empty() {
            self.badges = other.badges;
        }
    }
}

/// Engagement state of a comment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolbarPayload {
    pub like_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub is_hearted: Option<bool>,
    pub reply_token: Option<String>,
}

impl Merge for ToolbarPayload {
    fn merge(&mut self, other: Self) {
        fill(&mut self.like_count, other.like_count);
        fill(&mut self.reply_count, other.reply_count);
        fill(&mut self.is_hearted, other.is_hearted);
        fill(&mut self.reply_token, other.reply_token);
    }
}

/// Insertion-ordered map from comment id to a merged payload
#[derive(Debug, Clone)]
pub struct PayloadTable<T> {
    order: Vec<String>,
    entries: HashMap<String, T>,
}

impl<T> Default for PayloadTable<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<T: Merge + Default> PayloadTable<T> {
    /// Merge a payload into the entry for `id`
    pub fn insert(&mut self, id: &str, payload: T) {
        match self.entries.get_mut(id) {
            Some(existing) => existing.merge(payload),
            None => {
                self.order.push(id.to_string());
                self.entries.insert(id.to_string(), payload);
            }
        }
    }

    /// Register `id` with an empty payload, fixing its position
    pub fn reserve(&mut self, id: &str) {
        self.insert(id, T::default());
    }
}

impl<T> PayloadTable<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    /// Ids in first-seen order
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Everything one continuation response yields
#[derive(Debug, Clone, Default)]
pub struct PagePayloads {
    pub comments: PayloadTable<CommentPayload>,
    pub authors: PayloadTable<AuthorPayload>,
    pub toolbars: PayloadTable<ToolbarPayload>,
    /// Token of the next page, absent on the last one
    pub next_token: Option<String>,
}

/// Secondary keys (entity keys, toolbar keys, surface keys, author keys)
/// resolved to the comment id they belong to
#[derive(Debug, Default)]
struct Aliases(HashMap<String, String>);

impl Aliases {
    fn add(&mut self, key: Option<&str>, id: &str) {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.0.entry(key.to_string()).or_insert_with(|| id.to_string());
        }
    }

    fn resolve(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Extract the three payload tables and the next-page token
///
/// Never fails: a family absent from the response leaves its table empty.
pub fn extract(response: &Value) -> PagePayloads {
    let mut page = PagePayloads::default();
    let aliases = index_comments(response, &mut page);

    read_legacy_renderers(response, &mut page);
    read_view_models(response, &mut page);
    read_entity_payloads(response, &aliases, &mut page);
    read_legacy_toolbars(response, &mut page);
    read_reply_tokens(response, &mut page);

    page.next_token = next_page_token(response);

    tracing::debug!(
        comments = page.comments.len(),
        authors = page.authors.len(),
        toolbars = page.toolbars.len(),
        has_next = page.next_token.is_some(),
        "Extracted page payloads"
    );

    page
}

// ============================================================================
// Indexing
// ============================================================================

/// Fix comment order and collect key aliases
///
/// Rendered items decide the order. Comments known only from the mutation
/// list follow in mutation order.
fn index_comments(response: &Value, page: &mut PagePayloads) -> Aliases {
    let mut aliases = Aliases::default();

    walk(response, &mut |key, node| {
        match key {
            Some("frameworkUpdates") => return WalkControl::Skip,
            Some("commentRenderer") => {
                if let Some(id) = str_at(node, &["commentId"]) {
                    page.comments.reserve(id);
                }
            }
            Some("commentViewModel") => {
                if let Some(id) = str_at(node, &["commentId"]) {
                    page.comments.reserve(id);
                    for alias in ["commentKey", "toolbarStateKey", "commentSurfaceKey", "authorKey"]
                    {
                        aliases.add(str_at(node, &[alias]), id);
                    }
                }
            }
            _ => {}
        }
        WalkControl::Continue
    });

    walk(response, &mut |key, node| {
        if key != Some("commentEntityPayload") {
            return WalkControl::Continue;
        }
        if let Some(id) = str_at(node, &["properties", "commentId"]) {
            page.comments.reserve(id);
            aliases.add(str_at(node, &["key"]), id);
            aliases.add(str_at(node, &["properties", "toolbarStateKey"]), id);
            aliases.add(str_at(node, &["properties", "authorKey"]), id);
        }
        WalkControl::Skip
    });

    aliases
}

// ============================================================================
// Legacy inline renderer
// ============================================================================

fn read_legacy_renderers(response: &Value, page: &mut PagePayloads) {
    walk(response, &mut |key, node| {
        if key != Some("commentRenderer") {
            return WalkControl::Continue;
        }
        let Some(id) = str_at(node, &["commentId"]) else {
            return WalkControl::Skip;
        };

        page.comments.insert(
            id,
            CommentPayload {
                text: node.get("contentText").and_then(text_of),
                time_human: node.get("publishedTimeText").and_then(text_of),
                machine_time: None,
                reply_level: None,
                parent_key: None,
                is_pinned: node.get("pinnedCommentBadge").map(|_| true),
                paid_comment: node.get("paidCommentChipRenderer").map(chip_text),
            },
        );

        page.authors.insert(id, legacy_author(node));
        WalkControl::Skip
    });
}

fn legacy_author(node: &Value) -> AuthorPayload {
    let mut badges = Vec::new();
    if let Some(tooltip) = str_at(
        node,
        &["authorCommentBadge", "authorCommentBadgeRenderer", "iconTooltip"],
    ) {
        badges.push(tooltip.to_string());
    }
    if node.get("authorIsChannelOwner").and_then(Value::as_bool) == Some(true) {
        badges.push("Creator".to_string());
    }

    AuthorPayload {
        name: node.get("authorText").and_then(text_of),
        channel_id: str_at(node, &["authorEndpoint", "browseEndpoint", "browseId"])
            .map(str::to_string),
        avatar_url: last_thumbnail(node.get("authorThumbnail")),
        badges,
    }
}

/// Vote and reply counts of the legacy renderer
///
/// Fed in after the entity payloads so the numeric entity counts win.
fn read_legacy_toolbars(response: &Value, page: &mut PagePayloads) {
    walk(response, &mut |key, node| {
        if key != Some("commentRenderer") {
            return WalkControl::Continue;
        }
        if let Some(id) = str_at(node, &["commentId"]) {
            let hearted = get_path(
                node,
                &[
                    "actionButtons",
                    "commentActionButtonsRenderer",
                    "creatorHeart",
                    "creatorHeartRenderer",
                    "isHearted",
                ],
            )
            .and_then(Value::as_bool);

            page.toolbars.insert(
                id,
                ToolbarPayload {
                    like_count: node.get("voteCount").map(parse_count),
                    reply_count: node.get("replyCount").map(parse_count),
                    is_hearted: hearted,
                    reply_token: None,
                },
            );
        }
        WalkControl::Skip
    });
}

// ============================================================================
// View model and entity payloads
// ============================================================================

fn read_view_models(response: &Value, page: &mut PagePayloads) {
    walk(response, &mut |key, node| {
        if key != Some("commentViewModel") {
            return WalkControl::Continue;
        }
        if let Some(id) = str_at(node, &["commentId"]) {
            page.comments.insert(
                id,
                CommentPayload {
                    is_pinned: node.get("pinnedText").map(|_| true),
                    parent_key: parent_key(node),
                    ..CommentPayload::default()
                },
            );
        }
        WalkControl::Continue
    });
}

fn read_entity_payloads(response: &Value, aliases: &Aliases, page: &mut PagePayloads) {
    walk(response, &mut |key, node| {
        match key {
            Some("commentEntityPayload") => read_comment_entity(node, page),
            Some("engagementToolbarStateEntityPayload") => {
                let id = str_at(node, &["key"]).and_then(|k| aliases.resolve(k));
                if let (Some(id), Some(state)) = (id, str_at(node, &["heartState"])) {
                    page.toolbars.insert(
                        id,
                        ToolbarPayload {
                            is_hearted: Some(is_hearted_state(state)),
                            ..ToolbarPayload::default()
                        },
                    );
                }
            }
            Some("authorEntityPayload") => {
                if let Some(id) = str_at(node, &["key"]).and_then(|k| aliases.resolve(k)) {
                    page.authors.insert(id, entity_author(node));
                }
            }
            Some("commentSurfaceEntityPayload") => {
                let id = str_at(node, &["key"]).and_then(|k| aliases.resolve(k));
                if let (Some(id), Some(chip)) = (id, node.get("pdgCommentChip")) {
                    page.comments.insert(
                        id,
                        CommentPayload {
                            paid_comment: Some(chip_text(chip)),
                            ..CommentPayload::default()
                        },
                    );
                }
            }
            _ => return WalkControl::Continue,
        }
        WalkControl::Skip
    });
}

fn read_comment_entity(node: &Value, page: &mut PagePayloads) {
    let Some(properties) = node.get("properties") else {
        return;
    };
    let Some(id) = str_at(properties, &["commentId"]) else {
        return;
    };

    page.comments.insert(
        id,
        CommentPayload {
            text: get_path(properties, &["content", "content"])
                .and_then(Value::as_str)
                .map(str::to_string),
            time_human: str_at(properties, &["publishedTime"]).map(str::to_string),
            machine_time: properties
                .get("publishedTimeUsec")
                .or_else(|| properties.get("publishedTimestamp"))
                .cloned(),
            reply_level: properties.get("replyLevel").and_then(Value::as_u64),
            parent_key: parent_key(properties),
            is_pinned: None,
            paid_comment: None,
        },
    );

    if let Some(author) = node.get("author") {
        page.authors.insert(id, entity_author(author));
    }

    if let Some(toolbar) = node.get("toolbar") {
        let like_count = toolbar
            .get("likeCountNotliked")
            .or_else(|| toolbar.get("likeCountLiked"))
            .or_else(|| toolbar.get("likeCount"))
            .map(parse_count);

        page.toolbars.insert(
            id,
            ToolbarPayload {
                like_count,
                reply_count: toolbar.get("replyCount").map(parse_count),
                ..ToolbarPayload::default()
            },
        );
    }
}

/// Author fields shared by `commentEntityPayload.author` and
/// `authorEntityPayload`
fn entity_author(node: &Value) -> AuthorPayload {
    let flag = |name: &str| node.get(name).and_then(Value::as_bool) == Some(true);

    let mut badges = Vec::new();
    if flag("isVerified") {
        badges.push("Verified".to_string());
    }
    if flag("isCreator") {
        badges.push("Creator".to_string());
    }
    if flag("isArtist") {
        badges.push("Artist".to_string());
    }
    if let Some(listed) = node.get("authorBadges").and_then(Value::as_array) {
        badges.extend(
            listed
                .iter()
                .filter_map(|badge| str_at(badge, &["type"]))
                .filter(|kind| !kind.is_empty())
                .map(str::to_string),
        );
    }

    let avatar_url = str_at(node, &["avatarThumbnailUrl"])
        .map(str::to_string)
        .or_else(|| last_thumbnail(node.get("avatar")));

    AuthorPayload {
        name: node.get("displayName").and_then(text_of),
        channel_id: str_at(node, &["channelId"]).map(str::to_string),
        avatar_url,
        badges,
    }
}

fn parent_key(node: &Value) -> Option<String> {
    str_at(node, &["parentCommentKey"])
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Hearted only for a state ending in `_HEARTED`, never for `..._UNHEARTED`
fn is_hearted_state(state: &str) -> bool {
    let state = state.to_uppercase();
    state.ends_with("_HEARTED") && !state.contains("UNHEARTED")
}

fn chip_text(chip: &Value) -> String {
    let mut text = None;
    walk(chip, &mut |key, node| {
        if text.is_none() && matches!(key, Some("simpleText" | "content" | "text")) {
            text = text_of(node).filter(|t| !t.is_empty());
        }
        if text.is_some() {
            WalkControl::Skip
        } else {
            WalkControl::Continue
        }
    });
    text.unwrap_or_else(|| "Paid Comment".to_string())
}

fn last_thumbnail(node: Option<&Value>) -> Option<String> {
    node?
        .get("thumbnails")?
        .as_array()?
        .last()?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

// ============================================================================
// Continuation tokens
// ============================================================================

/// Reply tokens of the comment threads on this page
fn read_reply_tokens(response: &Value, page: &mut PagePayloads) {
    walk(response, &mut |key, thread| {
        if key != Some("commentThreadRenderer") {
            return WalkControl::Continue;
        }

        let id = str_at(thread, &["commentViewModel", "commentViewModel", "commentId"])
            .or_else(|| str_at(thread, &["commentViewModel", "commentId"]))
            .or_else(|| str_at(thread, &["comment", "commentRenderer", "commentId"]));

        let token = thread.get("replies").and_then(continuation_token_in);

        if let (Some(id), Some(token)) = (id, token) {
            page.toolbars.insert(
                id,
                ToolbarPayload {
                    reply_token: Some(token),
                    ..ToolbarPayload::default()
                },
            );
        }
        WalkControl::Skip
    });
}

const CONTINUATION_ACTIONS: &[&str] = &[
    "appendContinuationItemsAction",
    "reloadContinuationItemsCommand",
];

/// Subtrees whose tokens never point at the next page
const FOREIGN_TOKEN_OWNERS: &[&str] = &[
    "commentThreadRenderer",
    "commentsHeaderRenderer",
    "sortFilterSubMenuRenderer",
    "frameworkUpdates",
];

/// Token of the next page of this continuation chain
///
/// Looks first at continuation items placed directly in the response's
/// action lists, which covers both top-level pages and the "show more
/// replies" button of reply pages. Falls back to a structural search that
/// stays out of comment threads and sort menus.
pub fn next_page_token(response: &Value) -> Option<String> {
    let from_actions = response
        .get("onResponseReceivedEndpoints")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .flat_map(|endpoint| {
            CONTINUATION_ACTIONS
                .iter()
                .filter_map(move |action| get_path(endpoint, &[*action, "continuationItems"]))
        })
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|item| item.get("continuationItemRenderer"))
        .filter_map(continuation_token_in)
        .last();

    if from_actions.is_some() {
        return from_actions;
    }

    let mut token = None;
    walk(response, &mut |key, node| {
        if let Some(key) = key {
            if FOREIGN_TOKEN_OWNERS.contains(&key) {
                return WalkControl::Skip;
            }
            if token.is_none()
                && matches!(key, "continuationItemRenderer" | "nextContinuationData")
            {
                token = continuation_token_in(node)
                    .or_else(|| str_at(node, &["continuation"]).map(str::to_string));
                return WalkControl::Skip;
            }
        }
        WalkControl::Continue
    });
    token
}
