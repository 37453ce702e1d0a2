//! Post / reply / retweet classification.
//!
//! Checks run in a fixed order and the first match wins, so a retweet that
//! also carries reply metadata still lands in the retweet tab.

use crate::types::{ItemType, PostRecord};

/// Text prefix the export uses for old-style retweets.
const RETWEET_PREFIX: &str = "RT @";

pub fn classify(record: &PostRecord) -> ItemType {
    if record.text.starts_with(RETWEET_PREFIX) || present(&record.repost_of) {
        ItemType::Retweet
    } else if present(&record.in_reply_to_status_id) || present(&record.in_reply_to_user_id) {
        ItemType::Reply
    } else {
        ItemType::Post
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}
