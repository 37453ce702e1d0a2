//! HTML page generation.
//!
//! Last stage of the build. Takes the indexed archive and writes one
//! self-contained page plus the copied attachments.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                 # The whole archive
//! └── media/
//!     ├── 1049212345-photo.jpg   # Attachments, named <identifier>-<name>
//!     └── ...
//! ```
//!
//! ## Page Contract
//!
//! Each item is an `article.item` carrying `data-id`, `data-timestamp`
//! (epoch seconds), `data-type` and `data-likes`; the runtime filters and
//! sorts on those alone. The search index is embedded as JSON in
//! `script#search-index` with every `<` written as `\u003c`, so no item
//! text can close the script element early.
//!
//! The initial filter state is applied at generation time (items outside
//! the "posts" tab start `hidden`, the empty-state message shows when
//! nothing is visible), so the page reads correctly before the script runs.
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/archive.css`: Base styles (colors injected from config)
//! - `static/archive.js`: Filter, sort and search runtime
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Item bodies are the rewriter's output and go in as `PreEscaped`;
//! everything else goes through maud's escaping.

use crate::config::{self, LinkConfig, SiteConfig};
use crate::index::{Archive, ArchiveStats};
use crate::media::{MediaError, MediaIndex};
use crate::naming::{MediaKind, media_kind};
use crate::rewrite::{media_url, profile_url, status_url};
use crate::runtime::{FilterState, Runtime, SortMode, utc_day};
use crate::types::{ClassifiedItem, ItemType, SearchIndexEntry};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

const CSS_STATIC: &str = include_str!("../static/archive.css");
const JS: &str = include_str!("../static/archive.js");

/// Name of the generated page inside the output directory.
pub const PAGE_FILE: &str = "index.html";

/// What [`write_site`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSummary {
    pub page: PathBuf,
    pub media_copied: usize,
}

/// Render the page and write it with its media to `output_dir`.
///
/// The page is rendered in memory before anything touches the disk, and is
/// written to a temporary sibling first so a failed run never leaves a
/// truncated `index.html` behind.
pub fn write_site(
    archive: &Archive,
    config: &SiteConfig,
    media: &MediaIndex,
    output_dir: &Path,
) -> Result<SiteSummary, GenerateError> {
    let page = render_page(archive, config)?.into_string();

    fs::create_dir_all(output_dir)?;
    let media_copied = media.copy_to(archive.items.iter().map(ClassifiedItem::id), output_dir)?;

    let target = output_dir.join(PAGE_FILE);
    let staging = output_dir.join(format!("{PAGE_FILE}.tmp"));
    fs::write(&staging, page)?;
    fs::rename(&staging, &target)?;

    Ok(SiteSummary {
        page: target,
        media_copied,
    })
}

/// Render the complete archive page.
pub fn render_page(archive: &Archive, config: &SiteConfig) -> Result<Markup, GenerateError> {
    let index_json = search_index_json(&archive.search_index)?;
    let color_css = config::generate_color_css(&config.colors);
    let css = format!("{}\n\n{}", color_css, CSS_STATIC);

    let state = FilterState::for_stats(&archive.stats);
    let initial = Runtime::from_archive(archive).recompute(&state);
    let visible: HashSet<&str> = initial.visible.iter().map(String::as_str).collect();

    let content = html! {
        div #archive data-debounce=(config.search.debounce_ms) {
            (archive_header(&config.title, &archive.stats))
            (type_tabs(&archive.stats, state.active_type))
            (controls(&archive.stats, &state))
            p #empty-state hidden[!initial.empty] { "No items match the current filters." }
            main #items {
                @for item in &archive.items {
                    (render_item(item, &config.links, !visible.contains(item.id())))
                }
            }
        }
        script #search-index type="application/json" { (PreEscaped(index_json)) }
        script { (PreEscaped(JS)) }
    };

    Ok(base_document(&config.title, &css, content))
}

/// Serialize the index for embedding inside a `<script>` element.
pub fn search_index_json(entries: &[SearchIndexEntry]) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(entries)?.replace('<', "\\u003c"))
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body {
                (content)
            }
        }
    }
}

fn archive_header(title: &str, stats: &ArchiveStats) -> Markup {
    let range = utc_day(stats.min_timestamp).zip(utc_day(stats.max_timestamp));
    html! {
        header.archive-header {
            h1 { (title) }
            p.archive-stats {
                (stats.total) " items"
                @if stats.total > 0 {
                    @if let Some((first, last)) = range {
                        " from " time datetime=(first.to_string()) { (first.to_string()) }
                        " to " time datetime=(last.to_string()) { (last.to_string()) }
                    }
                }
            }
        }
    }
}

fn type_tabs(stats: &ArchiveStats, active: ItemType) -> Markup {
    html! {
        nav.tabs role="tablist" {
            @for item_type in ItemType::ALL {
                button.tab.active[item_type == active]
                    type="button"
                    role="tab"
                    data-type=(item_type.as_str())
                    aria-selected=(if item_type == active { "true" } else { "false" }) {
                    (item_type.label())
                    " "
                    span.count { (stats.count(item_type)) }
                }
            }
        }
    }
}

fn controls(stats: &ArchiveStats, state: &FilterState) -> Markup {
    let day = |ts: i64| {
        utc_day(ts)
            .filter(|_| stats.total > 0)
            .map(|d| d.to_string())
    };
    let (first, last) = (day(stats.min_timestamp), day(stats.max_timestamp));
    let date_from = state.date_from.map(|d| d.to_string());
    let date_to = state.date_to.map(|d| d.to_string());
    html! {
        div.controls {
            input #search type="search" placeholder="Search" autocomplete="off" value=(state.query);
            label {
                "From "
                input #date-from type="date" value=[date_from] min=[first.as_deref()] max=[last.as_deref()];
            }
            label {
                "To "
                input #date-to type="date" value=[date_to] min=[first.as_deref()] max=[last.as_deref()];
            }
            label {
                "Min likes "
                output #min-likes-value for="min-likes" { (state.min_likes) }
                input #min-likes type="range" min="0" max=(stats.max_likes) step="1" value=(state.min_likes);
            }
            label {
                "Sort "
                select #sort {
                    option value=(SortMode::Date.as_str()) selected[state.sort == SortMode::Date] { "Newest first" }
                    option value=(SortMode::Likes.as_str()) selected[state.sort == SortMode::Likes] { "Most liked" }
                }
            }
        }
    }
}

fn render_item(item: &ClassifiedItem, links: &LinkConfig, hidden: bool) -> Markup {
    let record = &item.record;
    let reply_to = record
        .in_reply_to_screen_name
        .as_deref()
        .filter(|name| !name.is_empty() && item.item_type == ItemType::Reply);

    html! {
        article.item
            data-id=(record.id)
            data-timestamp=(item.timestamp.timestamp())
            data-type=(item.item_type.as_str())
            data-likes=(record.like_count)
            hidden[hidden] {
            header.item-meta {
                time datetime=(item.timestamp.to_rfc3339()) {
                    (item.timestamp.format("%b %-d, %Y %H:%M UTC").to_string())
                }
                span.item-type { (item.item_type.label()) }
            }
            @if let Some(name) = reply_to {
                p.reply-to {
                    "Replying to "
                    a href=(profile_url(links, name)) { "@" (name) }
                }
            }
            div.item-text { (PreEscaped(&item.html)) }
            @if !item.media.is_empty() {
                div.item-media {
                    @for path in &item.media {
                        (render_media(path))
                    }
                }
            }
            footer.item-footer {
                span.likes title="Likes" { "♥ " (record.like_count) }
                span.reposts title="Retweets" { "⟲ " (record.repost_count) }
                a.permalink href=(status_url(links, &record.id)) rel="noopener noreferrer" target="_blank" {
                    "Original"
                }
            }
        }
    }
}

fn render_media(path: &str) -> Markup {
    let url = media_url(path);
    html! {
        @match media_kind(path) {
            MediaKind::Image => {
                a href=(url) target="_blank" {
                    img src=(url) alt="" loading="lazy";
                }
            }
            MediaKind::Video => {
                video src=(url) controls preload="metadata" {}
            }
            MediaKind::Other => {
                a.attachment href=(url) { (path.rsplit('/').next().unwrap_or(path)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_archive;
    use crate::test_helpers::*;
    use crate::types::PostRecord;
    use tempfile::TempDir;

    const T1: &str = "Fri Oct 12 10:00:00 +0000 2018";
    const T2: &str = "Thu Oct 11 10:00:00 +0000 2018";

    fn archive_of(records: Vec<PostRecord>) -> Archive {
        build_archive(records, &MediaIndex::default(), &LinkConfig::default())
    }

    fn page(archive: &Archive) -> String {
        render_page(archive, &SiteConfig::default())
            .unwrap()
            .into_string()
    }

    #[test]
    fn base_document_includes_doctype() {
        let content = html! { p { "test" } };
        let doc = base_document("Test", "body {}", content).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn base_document_keeps_css_verbatim() {
        let doc = base_document("T", "a > b { }", html! {}).into_string();
        assert!(doc.contains("a > b { }"));
    }

    #[test]
    fn items_carry_data_attributes() {
        let archive = archive_of(vec![liked(record("42", "hello", T1), 7)]);
        let html = page(&archive);
        assert!(html.contains(r#"data-id="42""#));
        assert!(html.contains(&format!(
            r#"data-timestamp="{}""#,
            archive.items[0].timestamp.timestamp()
        )));
        assert!(html.contains(r#"data-type="post""#));
        assert!(html.contains(r#"data-likes="7""#));
    }

    #[test]
    fn items_outside_default_tab_start_hidden() {
        let archive = archive_of(vec![
            record("1", "a post", T1),
            reply_to(record("2", "a reply", T2), "1"),
        ]);
        let html = page(&archive);
        assert!(html.contains(r#"data-type="post" data-likes="0">"#));
        assert!(html.contains(r#"data-type="reply" data-likes="0" hidden>"#));
        assert!(html.contains(r#"id="empty-state" hidden"#));
    }

    #[test]
    fn empty_archive_shows_empty_state() {
        let html = page(&archive_of(Vec::new()));
        assert!(html.contains(r#"<p id="empty-state">"#));
        assert!(!html.contains("<article"));
        assert!(html.contains(r#"<script id="search-index" type="application/json">[]</script>"#));
    }

    #[test]
    fn only_replies_shows_empty_state_for_posts_tab() {
        let html = page(&archive_of(vec![reply_to(record("2", "r", T2), "1")]));
        assert!(html.contains(r#"<p id="empty-state">"#));
    }

    #[test]
    fn item_text_is_escaped() {
        let archive = archive_of(vec![record("1", "<script>alert('x')</script>", T1)]);
        let html = page(&archive);
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn search_index_cannot_close_script() {
        let archive = archive_of(vec![record("1", "</script><b>", T1)]);
        let json = search_index_json(&archive.search_index).unwrap();
        assert!(!json.contains('<'));
        assert!(json.contains(r"\u003c/script>"));

        let parsed: Vec<SearchIndexEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].text, "</script><b>");
    }

    #[test]
    fn tabs_show_counts_and_active_tab() {
        let archive = archive_of(vec![
            record("1", "a", T1),
            record("2", "b", T2),
            record("3", "RT @x: c", T2),
        ]);
        let html = page(&archive);
        assert!(html.contains(r#"class="tab active""#));
        assert!(html.contains(r#"Posts <span class="count">2</span>"#));
        assert!(html.contains(r#"Retweets <span class="count">1</span>"#));
        assert!(html.contains(r#"Replies <span class="count">0</span>"#));
    }

    #[test]
    fn controls_default_to_archive_range() {
        let archive = archive_of(vec![liked(record("1", "a", T1), 12), record("2", "b", T2)]);
        let html = page(&archive);
        assert!(html.contains(r#"id="date-from" type="date" value="2018-10-11""#));
        assert!(html.contains(r#"id="date-to" type="date" value="2018-10-12""#));
        assert!(html.contains(r#"max="12""#));
        assert!(html.contains(r#"data-debounce="200""#));
    }

    #[test]
    fn reply_links_to_target_profile() {
        let mut r = reply_to(record("2", "@bob hi", T1), "1");
        r.in_reply_to_screen_name = Some("bob".to_string());
        let html = page(&archive_of(vec![r]));
        assert!(html.contains(r#"Replying to <a href="https://twitter.com/bob">@bob</a>"#));
    }

    #[test]
    fn permalink_uses_status_base() {
        let html = page(&archive_of(vec![record("99", "x", T1)]));
        assert!(html.contains(r#"href="https://twitter.com/i/web/status/99""#));
    }

    #[test]
    fn media_renders_by_kind() {
        assert!(render_media("media/1-a.jpg").into_string().contains(r#"<img src="media/1-a.jpg""#));
        assert!(render_media("media/1-a.mp4").into_string().contains("<video"));
        assert!(render_media("media/1-a.bin").into_string().contains(">1-a.bin</a>"));
    }

    #[test]
    fn media_with_reserved_characters_is_percent_encoded() {
        let html = render_media("media/1-a#1?.jpg").into_string();
        assert!(html.contains(r#"src="media/1-a%231%3F.jpg""#), "{html}");
        let html = render_media("media/1-50%.bin").into_string();
        assert!(html.contains(r#"href="media/1-50%25.bin""#), "{html}");
        assert!(html.contains(">1-50%.bin</a>"));
    }

    #[test]
    fn write_site_writes_page_and_media() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("1-a.jpg"), "img").unwrap();
        fs::write(src.path().join("2-b.jpg"), "img").unwrap();
        let media = MediaIndex::from_dir(src.path()).unwrap();
        let archive = build_archive(
            vec![record("1", "hello", T1), record("2", "bad", "never")],
            &media,
            &LinkConfig::default(),
        );
        let out = TempDir::new().unwrap();
        let dist = out.path().join("dist");

        let summary = write_site(&archive, &SiteConfig::default(), &media, &dist).unwrap();

        assert_eq!(summary.page, dist.join("index.html"));
        assert_eq!(summary.media_copied, 1);
        assert!(dist.join("media/1-a.jpg").exists());
        assert!(!dist.join("media/2-b.jpg").exists());
        assert!(!dist.join("index.html.tmp").exists());
        let html = fs::read_to_string(dist.join("index.html")).unwrap();
        assert!(html.contains(r#"src="media/1-a.jpg""#));
    }

    #[test]
    fn write_site_replaces_existing_page() {
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("index.html"), "old").unwrap();
        let archive = archive_of(vec![record("1", "fresh", T1)]);

        write_site(&archive, &SiteConfig::default(), &MediaIndex::default(), out.path()).unwrap();

        let html = fs::read_to_string(out.path().join("index.html")).unwrap();
        assert!(html.contains("fresh"));
    }
}
