//! Shared types used across the pipeline.
//!
//! A [`PostRecord`] is what the export reader produces; a [`ClassifiedItem`]
//! is what the index builder hands to the page generator. The
//! [`SearchIndexEntry`] is serialized into the page and read back by the
//! browser runtime, so its JSON field names are part of the page contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open range `[start, end)` over a post's text, counted in `char`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A span is applicable when it is non-empty and ends inside the text.
    pub fn fits(&self, len: usize) -> bool {
        self.start < self.end && self.end <= len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MentionSpan {
    pub span: Span,
    /// Screen name without the leading `@`.
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpan {
    pub span: Span,
    /// Shortened URL as it appears in the text.
    pub url: String,
    pub expanded_url: Option<String>,
    pub display_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashtagSpan {
    pub span: Span,
    /// Tag text without the leading `#`.
    pub tag: String,
}

/// Attached media reference. Only the span matters: it is cut from the text
/// and the files are rendered in their own block.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSpan {
    pub span: Span,
}

/// All annotated ranges of one post, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySet {
    pub mentions: Vec<MentionSpan>,
    pub links: Vec<LinkSpan>,
    pub hashtags: Vec<HashtagSpan>,
    pub media: Vec<MediaSpan>,
}

impl EntitySet {
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
            && self.links.is_empty()
            && self.hashtags.is_empty()
            && self.media.is_empty()
    }
}

/// One exported post, as read from the data files.
///
/// Optional identifiers are `None` when absent or empty in the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostRecord {
    pub id: String,
    pub text: String,
    /// Creation time in the export's own format; parsed by the index builder.
    pub created_at: String,
    pub like_count: u64,
    pub repost_count: u64,
    pub in_reply_to_status_id: Option<String>,
    pub in_reply_to_user_id: Option<String>,
    pub in_reply_to_screen_name: Option<String>,
    /// Identifier of the reposted item, when the export carries one.
    pub repost_of: Option<String>,
    pub entities: EntitySet,
}

/// The three tabs of the archive page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Post,
    Reply,
    Retweet,
}

impl ItemType {
    pub const ALL: [ItemType; 3] = [ItemType::Post, ItemType::Reply, ItemType::Retweet];

    /// Value used in `data-type` attributes and the search index.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Post => "post",
            ItemType::Reply => "reply",
            ItemType::Retweet => "retweet",
        }
    }

    /// Tab label.
    pub fn label(self) -> &'static str {
        match self {
            ItemType::Post => "Posts",
            ItemType::Reply => "Replies",
            ItemType::Retweet => "Retweets",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post ready for rendering. Built once per run by the index builder.
#[derive(Debug, Clone)]
pub struct ClassifiedItem {
    pub record: PostRecord,
    pub item_type: ItemType,
    pub timestamp: DateTime<Utc>,
    /// Rewritten, escaped body markup.
    pub html: String,
    /// Media files relative to the output directory.
    pub media: Vec<String>,
}

impl ClassifiedItem {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn likes(&self) -> u64 {
        self.record.like_count
    }
}

/// Compact per-item record embedded in the page for client-side search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    pub id: String,
    /// Lowercased plain text with markup removed.
    pub text: String,
    /// Seconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}
