//! Filename parsing for the `<identifier>-<name>` media convention.
//!
//! The export stores every attachment in a flat media folder, and a file
//! belongs to the post whose identifier prefixes its name:
//!
//! - `1049003491234-D5mXyz.jpg` → owner `1049003491234`, name `D5mXyz.jpg`
//! - `1049003491234-clip.mp4` → owner `1049003491234`, name `clip.mp4`
//! - `cover.jpg` → no owner, ignored
//!
//! Parsing only tells whether a name can belong to a post at all. Which post
//! it belongs to is decided by matching `<identifier>-` against the known
//! identifiers (see [`crate::media::MediaIndex::files_for`]), since an
//! identifier is an arbitrary string and may itself contain a dash.

/// Result of parsing a media filename like `1049003491234-D5mXyz.jpg`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMediaName {
    /// Identifier of the owning post.
    pub owner_id: String,
    /// Remainder after the first dash. Empty if nothing follows the dash.
    pub name: String,
}

/// Parse a media filename following the `<identifier>-<name>` convention.
///
/// Splits at the first dash. Returns `None` when there is no dash or
/// nothing precedes it.
pub fn parse_media_name(file_name: &str) -> Option<ParsedMediaName> {
    let (prefix, rest) = file_name.split_once('-')?;
    if prefix.is_empty() {
        return None;
    }
    Some(ParsedMediaName {
        owner_id: prefix.to_string(),
        name: rest.to_string(),
    })
}

/// Broad media class used to pick the element that renders a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

pub fn media_kind(file_name: &str) -> MediaKind {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" => MediaKind::Image,
        "mp4" | "mov" | "webm" => MediaKind::Video,
        _ => MediaKind::Other,
    }
}
