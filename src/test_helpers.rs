//! Shared test utilities for the simple-archive test suite.
//!
//! Provides record builders, fixture setup and lookup helpers that work with
//! the index builder's output (`Archive`, `ClassifiedItem`).
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let records = vec![
//!     record("1", "hello", "Wed Oct 10 20:19:24 +0000 2018"),
//!     liked(record("2", "world", "Thu Oct 11 08:00:00 +0000 2018"), 7),
//! ];
//! let archive = build_archive(records, &MediaIndex::default(), &LinkConfig::default());
//!
//! assert_eq!(item_ids(&archive), ["2", "1"]);
//! assert_eq!(find_item(&archive, "2").likes(), 7);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::index::Archive;
use crate::types::{ClassifiedItem, PostRecord};

// -------------------------------------------------------------------------
// Fixtures
// -------------------------------------------------------------------------

/// A private, writable copy of `fixtures/export/`.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/export");
    for entry in WalkDir::new(&fixtures).min_depth(1) {
        let entry = entry.unwrap();
        let target = tmp.path().join(entry.path().strip_prefix(&fixtures).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    tmp
}

// -------------------------------------------------------------------------
// Record builders
// -------------------------------------------------------------------------

/// A plain post with no counts, entities or reply metadata.
pub fn record(id: &str, text: &str, created_at: &str) -> PostRecord {
    PostRecord {
        id: id.to_string(),
        text: text.to_string(),
        created_at: created_at.to_string(),
        ..PostRecord::default()
    }
}

/// Same record with its like count set.
pub fn liked(mut record: PostRecord, likes: u64) -> PostRecord {
    record.like_count = likes;
    record
}

/// Same record marked as a reply to `status_id`.
pub fn reply_to(mut record: PostRecord, status_id: &str) -> PostRecord {
    record.in_reply_to_status_id = Some(status_id.to_string());
    record
}

// -------------------------------------------------------------------------
// Archive lookups; panics with a clear message on miss
// -------------------------------------------------------------------------

/// Find an item by identifier. Panics if not found.
pub fn find_item<'a>(archive: &'a Archive, id: &str) -> &'a ClassifiedItem {
    archive
        .items
        .iter()
        .find(|item| item.id() == id)
        .unwrap_or_else(|| panic!("item '{id}' not found. Available: {:?}", item_ids(archive)))
}

/// All item identifiers in render order.
pub fn item_ids(archive: &Archive) -> Vec<&str> {
    archive.items.iter().map(ClassifiedItem::id).collect()
}
