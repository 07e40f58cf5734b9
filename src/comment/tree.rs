//! Thread assembly from flat record lists

use serde::Serialize;
use std::collections::HashMap;

use crate::models::CommentRecord;

/// A top-level comment with the replies collected for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread {
    pub comment: CommentRecord,
    pub replies: Vec<CommentRecord>,
}

/// Threads plus replies whose parent was not in the input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThreadForest {
    pub threads: Vec<CommentThread>,
    pub orphans: Vec<CommentRecord>,
}

/// Group a flat list of records into threads
///
/// Top-level order is kept as given. Replies keep their relative order and
/// are attached by `parent_id`.
pub fn build_threads(records: Vec<CommentRecord>) -> ThreadForest {
    let mut top_level = Vec::new();
    let mut replies_map: HashMap<String, Vec<CommentRecord>> = HashMap::new();
    let mut reply_order: Vec<String> = Vec::new();

    for record in records {
        match (record.is_reply, record.parent_id.clone()) {
            (true, Some(parent_id)) => {
                if !replies_map.contains_key(&parent_id) {
                    reply_order.push(parent_id.clone());
                }
                replies_map.entry(parent_id).or_default().push(record);
            }
            _ => top_level.push(record),
        }
    }

    let threads = top_level
        .into_iter()
        .map(|comment| {
            let replies = replies_map.remove(&comment.id).unwrap_or_default();
            CommentThread { comment, replies }
        })
        .collect();

    let orphans = reply_order
        .into_iter()
        .filter_map(|parent| replies_map.remove(&parent))
        .flatten()
        .collect();

    ThreadForest { threads, orphans }
}
