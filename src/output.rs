//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! is what the archive contains (posts, replies, retweets, date range, most
//! liked items); data files and folders are shown as secondary context via
//! indented `Source:` lines.
//!
//! # Output Format
//!
//! ## Load
//!
//! ```text
//! Export
//!     Source: data/
//!     001 tweets.js (120 posts)
//!     002 tweets-part1.js (80 posts)
//!     Skipped: 2 posts without identifier
//!     Media: 14 files
//!         Source: data/tweets_media/
//!
//! Config
//!     config.toml
//! ```
//!
//! ## Index
//!
//! ```text
//! Archive
//!     Posts: 150
//!     Replies: 40
//!     Retweets: 10
//!     Dropped: 3 (unparseable date)
//!     Range: 2018-10-10 → 2020-01-05
//!     Most liked
//!         001 2019-03-02 ♥ 123 Something witty about...
//! ```
//!
//! ## Generate
//!
//! ```text
//! Archive → index.html
//!     200 items
//!     14 media files → media/
//!
//! Generated dist/index.html
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::config::CONFIG_FILE;
use crate::export::Export;
use crate::generate::SiteSummary;
use crate::index::{Archive, plain_text};
use crate::media::{MediaIndex, OUTPUT_MEDIA_DIR};
use crate::runtime::utc_day;
use crate::types::{ClassifiedItem, ItemType};
use std::path::Path;

/// How many of the most liked items the index summary lists.
const TOP_LIKED: usize = 3;

/// Preview length of item text, in characters.
const PREVIEW_CHARS: usize = 40;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
    }
}

/// Single-line preview of an item body.
fn item_preview(item: &ClassifiedItem) -> String {
    let plain = plain_text(&item.html);
    let flat = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_desc(&flat, PREVIEW_CHARS)
}

/// Path relative to `root` with a trailing slash, for directories.
fn relative_dir(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    if rel.as_os_str().is_empty() {
        "./".to_string()
    } else {
        format!("{}/", rel.display())
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Stage 1: Load output
// ============================================================================

/// Format what was read from the export directory.
pub fn format_load_output(export: &Export, media: &MediaIndex, source_root: &Path) -> Vec<String> {
    let mut lines = vec!["Export".to_string()];
    lines.push(format!(
        "{}Source: {}",
        indent(1),
        relative_dir(&export.data_dir, source_root)
    ));

    for (i, file) in export.files.iter().enumerate() {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        lines.push(format!(
            "{}{} {} ({})",
            indent(1),
            format_index(i + 1),
            name,
            plural(file.posts, "post", "posts")
        ));
    }

    if export.skipped > 0 {
        lines.push(format!(
            "{}Skipped: {} without identifier",
            indent(1),
            plural(export.skipped, "post", "posts")
        ));
    }

    lines.push(format!(
        "{}Media: {}",
        indent(1),
        plural(media.len(), "file", "files")
    ));
    if let Some(dir) = media.source_dir() {
        lines.push(format!("{}Source: {}", indent(2), relative_dir(dir, source_root)));
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if source_root.join(CONFIG_FILE).exists() {
        lines.push(format!("{}{CONFIG_FILE}", indent(1)));
    } else {
        lines.push(format!("{}(defaults)", indent(1)));
    }

    lines
}

/// Print load output to stdout.
pub fn print_load_output(export: &Export, media: &MediaIndex, source_root: &Path) {
    for line in format_load_output(export, media, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Index output
// ============================================================================

/// Format the archive summary: counts, date range, most liked items.
pub fn format_archive_output(archive: &Archive) -> Vec<String> {
    let stats = &archive.stats;
    let mut lines = vec!["Archive".to_string()];

    for item_type in ItemType::ALL {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            item_type.label(),
            stats.count(item_type)
        ));
    }
    if stats.dropped > 0 {
        lines.push(format!("{}Dropped: {} (unparseable date)", indent(1), stats.dropped));
    }

    if archive.is_empty() {
        lines.push(format!("{}Empty archive", indent(1)));
        return lines;
    }

    if let (Some(first), Some(last)) = (utc_day(stats.min_timestamp), utc_day(stats.max_timestamp)) {
        lines.push(format!("{}Range: {} → {}", indent(1), first, last));
    }

    let mut by_likes: Vec<&ClassifiedItem> =
        archive.items.iter().filter(|item| item.likes() > 0).collect();
    by_likes.sort_by(|a, b| b.likes().cmp(&a.likes()));
    if !by_likes.is_empty() {
        lines.push(format!("{}Most liked", indent(1)));
        for (i, item) in by_likes.iter().take(TOP_LIKED).enumerate() {
            lines.push(format!(
                "{}{} {} ♥ {} {}",
                indent(2),
                format_index(i + 1),
                item.timestamp.date_naive(),
                item.likes(),
                item_preview(item)
            ));
        }
    }

    lines
}

/// Print archive summary to stdout.
pub fn print_archive_output(archive: &Archive) {
    for line in format_archive_output(archive) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 3: Generate output
// ============================================================================

/// Format what was written to the output directory.
pub fn format_generate_output(archive: &Archive, summary: &SiteSummary) -> Vec<String> {
    let page_name = summary
        .page
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut lines = vec![format!("Archive → {}", page_name)];
    lines.push(format!(
        "{}{}",
        indent(1),
        plural(archive.stats.total, "item", "items")
    ));
    if summary.media_copied > 0 {
        lines.push(format!(
            "{}{} → {}/",
            indent(1),
            plural(summary.media_copied, "media file", "media files"),
            OUTPUT_MEDIA_DIR
        ));
    }
    lines.push(String::new());
    lines.push(format!("Generated {}", summary.page.display()));
    lines
}

/// Print generate output to stdout.
pub fn print_generate_output(archive: &Archive, summary: &SiteSummary) {
    for line in format_generate_output(archive, summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
