//! Archive index builder.
//!
//! Consumes every record of the export in one pass and produces the three
//! things the page generator needs:
//!
//! - the **render list**: classified, rewritten items, newest first;
//! - the **stats**: per-type counts, like ceiling, date range;
//! - the **search index**: one compact entry per item, embedded as JSON.
//!
//! Records whose creation time cannot be parsed are left out of all three.
//! They are only counted, never reported as errors: a partial archive is
//! more useful than none.

use crate::classify::classify;
use crate::config::LinkConfig;
use crate::media::MediaIndex;
use crate::rewrite::rewrite_text;
use crate::types::{ClassifiedItem, ItemType, PostRecord, SearchIndexEntry};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Creation time format used by the export, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const EXPORT_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Everything the page generator renders.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub items: Vec<ClassifiedItem>,
    pub stats: ArchiveStats,
    pub search_index: Vec<SearchIndexEntry>,
}

impl Archive {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Aggregates over the retained items. Timestamps are epoch seconds and are
/// zero for an empty archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub posts: usize,
    pub replies: usize,
    pub retweets: usize,
    pub total: usize,
    /// Records left out because their timestamp did not parse.
    pub dropped: usize,
    pub max_likes: u64,
    pub min_timestamp: i64,
    pub max_timestamp: i64,
}

impl ArchiveStats {
    fn collect(items: &[ClassifiedItem], dropped: usize) -> Self {
        let mut stats = Self {
            dropped,
            ..Self::default()
        };
        for item in items {
            match item.item_type {
                ItemType::Post => stats.posts += 1,
                ItemType::Reply => stats.replies += 1,
                ItemType::Retweet => stats.retweets += 1,
            }
            stats.max_likes = stats.max_likes.max(item.likes());
        }
        stats.total = items.len();
        // items are sorted newest first
        if let (Some(newest), Some(oldest)) = (items.first(), items.last()) {
            stats.max_timestamp = newest.timestamp.timestamp();
            stats.min_timestamp = oldest.timestamp.timestamp();
        }
        stats
    }

    pub fn count(&self, item_type: ItemType) -> usize {
        match item_type {
            ItemType::Post => self.posts,
            ItemType::Reply => self.replies,
            ItemType::Retweet => self.retweets,
        }
    }
}

/// Classify, rewrite and index the whole collection.
pub fn build_archive(records: Vec<PostRecord>, media: &MediaIndex, links: &LinkConfig) -> Archive {
    let mut dropped = 0;
    let mut items = Vec::with_capacity(records.len());

    for record in records {
        let Some(timestamp) = parse_timestamp(&record.created_at) else {
            debug!(
                id = %record.id,
                created_at = %record.created_at,
                "dropping record with unparseable timestamp"
            );
            dropped += 1;
            continue;
        };
        let item_type = classify(&record);
        let html = rewrite_text(&record.text, &record.entities, links);
        let media = media.paths_for(&record.id);
        items.push(ClassifiedItem {
            record,
            item_type,
            timestamp,
            html,
            media,
        });
    }

    // sort_by is stable: equal timestamps keep export order
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let stats = ArchiveStats::collect(&items, dropped);
    let search_index = items.iter().map(search_entry).collect();
    Archive {
        items,
        stats,
        search_index,
    }
}

/// Parse a creation time in the export format, falling back to RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, EXPORT_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn search_entry(item: &ClassifiedItem) -> SearchIndexEntry {
    SearchIndexEntry {
        id: item.id().to_string(),
        text: plain_text(&item.html).to_lowercase(),
        timestamp: item.timestamp.timestamp(),
        item_type: item.item_type,
    }
}

/// Drop markup from rewritten HTML and decode the basic entities.
///
/// `<br>` becomes a newline so tokenization still splits there.
pub fn plain_text(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        stripped.push_str(&rest[..open]);
        let tag = &rest[open..];
        let Some(close) = tag.find('>') else {
            // no closing bracket: keep the remainder as text
            stripped.push_str(tag);
            rest = "";
            break;
        };
        if tag[1..close].trim_end_matches('/').trim().eq_ignore_ascii_case("br") {
            stripped.push('\n');
        }
        rest = &tag[close + 1..];
    }
    stripped.push_str(rest);
    decode_basic_entities(&stripped)
}

fn decode_basic_entities(text: &str) -> String {
    const ENTITIES: [(&str, char); 6] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
        ("&apos;", '\''),
    ];
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match ENTITIES.iter().find(|(name, _)| tail.starts_with(name)) {
            Some((name, ch)) => {
                out.push(*ch);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::types::{HashtagSpan, Span};

    const T1: &str = "Fri Oct 12 10:00:00 +0000 2018";
    const T2: &str = "Thu Oct 11 10:00:00 +0000 2018";
    const T3: &str = "Wed Oct 10 10:00:00 +0000 2018";

    fn build(records: Vec<PostRecord>) -> Archive {
        build_archive(records, &MediaIndex::default(), &LinkConfig::default())
    }

    #[test]
    fn parses_export_format() {
        let t = parse_timestamp("Wed Oct 10 20:19:24 +0000 2018").unwrap();
        assert_eq!(t.to_rfc3339(), "2018-10-10T20:19:24+00:00");
    }

    #[test]
    fn parses_offset_into_utc() {
        let t = parse_timestamp("Wed Oct 10 20:19:24 +0200 2018").unwrap();
        assert_eq!(t.to_rfc3339(), "2018-10-10T18:19:24+00:00");
    }

    #[test]
    fn parses_rfc3339_fallback() {
        let t = parse_timestamp("2018-10-10T20:19:24Z").unwrap();
        assert_eq!(t.timestamp(), 1_539_202_764);
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("Wed Oct 32 20:19:24 +0000 2018").is_none());
    }

    #[test]
    fn render_list_is_newest_first() {
        let archive = build(vec![
            record("3", "old", T3),
            record("1", "new", T1),
            record("2", "mid", T2),
        ]);
        assert_eq!(item_ids(&archive), ["1", "2", "3"]);
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let archive = build(vec![
            record("b", "x", T2),
            record("a", "x", T1),
            record("c", "x", T2),
            record("d", "x", T2),
        ]);
        assert_eq!(item_ids(&archive), ["a", "b", "c", "d"]);
    }

    #[test]
    fn unparseable_records_are_dropped_everywhere() {
        let archive = build(vec![
            liked(record("1", "ok", T1), 3),
            liked(record("2", "bad", "not a date"), 99),
        ]);
        assert_eq!(item_ids(&archive), ["1"]);
        assert_eq!(archive.search_index.len(), 1);
        assert_eq!(archive.stats.total, 1);
        assert_eq!(archive.stats.dropped, 1);
        assert_eq!(archive.stats.max_likes, 3);
    }

    #[test]
    fn empty_input_gives_zero_stats() {
        let archive = build(Vec::new());
        assert!(archive.is_empty());
        assert!(archive.search_index.is_empty());
        assert_eq!(archive.stats, ArchiveStats::default());
    }

    #[test]
    fn all_dropped_counts_only_dropped() {
        let archive = build(vec![record("1", "x", "nope")]);
        assert!(archive.is_empty());
        assert_eq!(archive.stats.dropped, 1);
        assert_eq!(archive.stats.min_timestamp, 0);
        assert_eq!(archive.stats.max_timestamp, 0);
    }

    #[test]
    fn stats_count_types_and_range() {
        let archive = build(vec![
            liked(record("1", "hello", T2), 4),
            reply_to(liked(record("2", "@a hi", T3), 10), "9"),
            record("3", "RT @b: yes", T1),
        ]);
        let stats = archive.stats;
        assert_eq!(stats.count(ItemType::Post), 1);
        assert_eq!(stats.count(ItemType::Reply), 1);
        assert_eq!(stats.count(ItemType::Retweet), 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.max_likes, 10);
        assert_eq!(stats.max_timestamp, parse_timestamp(T1).unwrap().timestamp());
        assert_eq!(stats.min_timestamp, parse_timestamp(T3).unwrap().timestamp());
    }

    #[test]
    fn items_carry_type_html_and_media() {
        let mut media = MediaIndex::default();
        media.insert("1-cat.jpg");
        let mut r = record("1", "a #cat\nb", T1);
        r.entities.hashtags.push(HashtagSpan {
            span: Span::new(2, 6),
            tag: "cat".to_string(),
        });
        let archive = build_archive(vec![r], &media, &LinkConfig::default());

        let item = find_item(&archive, "1");
        assert_eq!(item.item_type, ItemType::Post);
        assert!(item.html.contains(r#"class="hashtag""#));
        assert!(item.html.contains("<br>"));
        assert_eq!(item.media, ["media/1-cat.jpg"]);
    }

    #[test]
    fn search_text_is_plain_and_lowercase() {
        let mut r = record("1", "Hello #Rust\nA & B", T1);
        r.entities.hashtags.push(HashtagSpan {
            span: Span::new(6, 11),
            tag: "Rust".to_string(),
        });
        let archive = build(vec![r]);

        let entry = &archive.search_index[0];
        assert_eq!(entry.id, "1");
        assert_eq!(entry.text, "hello #rust\na & b");
        assert_eq!(entry.item_type, ItemType::Post);
        assert_eq!(entry.timestamp, parse_timestamp(T1).unwrap().timestamp());
    }

    #[test]
    fn plain_text_strips_tags() {
        assert_eq!(plain_text(r#"<a href="x">link</a> tail"#), "link tail");
        assert_eq!(plain_text("a<br>b<br/>c"), "a\nb\nc");
        assert_eq!(plain_text("unclosed <b"), "unclosed <b");
    }

    #[test]
    fn plain_text_decodes_once() {
        assert_eq!(plain_text("&amp;lt; &lt;3 &#39;x&#39;"), "&lt; <3 'x'");
        assert_eq!(plain_text("AT&T &copy;"), "AT&T &copy;");
    }
}
