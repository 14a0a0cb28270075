//! Comment tree flattening
//!
//! Turns one page of top-level comments, each carrying a preview of nested
//! replies, into an ordered flat record stream: every top-level comment is
//! followed directly by its replies. Only one nesting level exists in the
//! list payload, so no recursion happens.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{CommentNode, CommentPage, CommentRecord, NESTED_REPLY_MARKER};

/// Flatten one page into records, preserving page order
pub fn flatten_page(page: &CommentPage) -> Vec<CommentRecord> {
    let capacity = page.comments.iter().map(|c| 1 + c.replies.len()).sum();
    let mut records = Vec::with_capacity(capacity);

    for comment in &page.comments {
        records.push(top_level_record(comment));
        records.extend(comment.replies.iter().map(nested_reply_record));
    }

    records
}

fn top_level_record(node: &CommentNode) -> CommentRecord {
    CommentRecord {
        comment_id: node.id.clone(),
        author: node.author.clone(),
        author_sex: node.author_sex.clone(),
        author_level: node.author_level,
        content: node.message.clone(),
        likes: node.likes,
        posted_at: timestamp_to_datetime(node.ctime),
        reply_count: node.reply_count,
        floor: node.floor,
        is_nested_reply: false,
    }
}

// The list payload carries no reply counts for nested replies
fn nested_reply_record(node: &CommentNode) -> CommentRecord {
    CommentRecord {
        content: format!("{NESTED_REPLY_MARKER}{}", node.message),
        reply_count: 0,
        is_nested_reply: true,
        ..top_level_record(node)
    }
}

/// Convert a unix timestamp (seconds) to `DateTime<Utc>`; out-of-range values map to the epoch
fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
