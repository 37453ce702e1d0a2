//! Reading the social-media data export.
//!
//! The export ships its data as JavaScript files that assign one JSON array
//! to a global, e.g. `data/tweets.js`:
//!
//! ```text
//! window.YTD.tweets.part0 = [
//!   { "tweet" : { "id_str" : "1049...", "full_text" : "...", ... } },
//!   ...
//! ]
//! ```
//!
//! Nothing here evaluates that file. The assignment target is checked
//! against the `window.YTD.<name>.part<N>` pattern, the right-hand side is
//! parsed as JSON, and the JSON must be an array of `{ "tweet": {...} }`
//! wrappers. Any other shape is an error for the whole file.
//!
//! Inside a post object the reader is forgiving: counts and indices may be
//! numbers or numeric strings, unknown fields are ignored, malformed counts
//! read as zero, and an entity with unusable indices is dropped on its own.
//! Large exports are split into `tweets.js`, `tweets-part1.js`, ...; all
//! parts are read in order.

use crate::types::{EntitySet, HashtagSpan, LinkSpan, MediaSpan, MentionSpan, PostRecord, Span};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Export directory not found: {0}")]
    MissingSource(PathBuf),
    #[error("No tweet data files (tweets.js, tweet.js) in {0}")]
    NoDataFiles(PathBuf),
    #[error("Cannot read {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Why a single data file was rejected.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("expected `window.YTD.<name>.partN = [...]`, {0}")]
    Shape(String),
    #[error("invalid post array: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything read from an export directory.
#[derive(Debug)]
pub struct Export {
    /// Directory holding the data files (`<root>/data` or the root itself).
    pub data_dir: PathBuf,
    /// Data files read, in part order.
    pub files: Vec<DataFile>,
    pub records: Vec<PostRecord>,
    /// Post objects without any usable identifier.
    pub skipped: usize,
}

/// One data file and the number of posts it held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub path: PathBuf,
    pub posts: usize,
}

/// Locate and parse all tweet data files under `root`.
///
/// Fails before returning anything if the directory is missing, holds no
/// data files, or any file does not have the expected shape.
pub fn load_export(root: &Path) -> Result<Export, ExportError> {
    if !root.is_dir() {
        return Err(ExportError::MissingSource(root.to_path_buf()));
    }
    let data_dir = data_dir(root);
    let paths = find_data_files(&data_dir)?;
    if paths.is_empty() {
        return Err(ExportError::NoDataFiles(data_dir));
    }

    let mut files = Vec::with_capacity(paths.len());
    let mut records = Vec::new();
    let mut skipped = 0;
    for path in paths {
        let content = fs::read_to_string(&path)?;
        let parsed = parse_data_script(&content).map_err(|source| ExportError::Parse {
            path: path.clone(),
            source,
        })?;
        info!(file = %path.display(), posts = parsed.records.len(), "read data file");
        skipped += parsed.skipped;
        files.push(DataFile {
            path,
            posts: parsed.records.len(),
        });
        records.extend(parsed.records);
    }

    Ok(Export {
        data_dir,
        files,
        records,
        skipped,
    })
}

/// `<root>/data` when it exists, otherwise `root` itself.
pub fn data_dir(root: &Path) -> PathBuf {
    let nested = root.join("data");
    if nested.is_dir() { nested } else { root.to_path_buf() }
}

fn find_data_files(dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let mut found: Vec<(u32, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?;
            data_file_part(name).map(|part| (part, p.clone()))
        })
        .collect();
    found.sort();
    Ok(found.into_iter().map(|(_, p)| p).collect())
}

/// Part number of a tweet data file: `tweets.js` is 0, `tweets-part3.js` is 3.
fn data_file_part(name: &str) -> Option<u32> {
    let stem = name.strip_suffix(".js")?;
    let rest = stem
        .strip_prefix("tweets")
        .or_else(|| stem.strip_prefix("tweet"))?;
    if rest.is_empty() {
        return Some(0);
    }
    let digits = rest.strip_prefix("-part")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Posts parsed from one data file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub records: Vec<PostRecord>,
    pub skipped: usize,
}

/// Parse the text of one data file without evaluating it.
pub fn parse_data_script(source: &str) -> Result<ParsedFile, ParseError> {
    let source = source.trim_start_matches('\u{feff}').trim();
    let (target, payload) = source
        .split_once('=')
        .ok_or_else(|| ParseError::Shape("found no assignment".into()))?;
    check_assignment_target(target.trim())?;

    let payload = payload.trim().trim_end_matches(';').trim_end();
    let wrappers: Vec<Wrapper> = serde_json::from_str(payload)?;

    let mut parsed = ParsedFile::default();
    for wrapper in wrappers {
        match wrapper.tweet.into_record() {
            Some(record) => parsed.records.push(record),
            None => {
                warn!("skipping post without an identifier");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

fn check_assignment_target(target: &str) -> Result<(), ParseError> {
    let parts: Vec<&str> = target.split('.').collect();
    let [window, ytd, name, part] = parts.as_slice() else {
        return Err(ParseError::Shape(format!("found `{target}`")));
    };
    let name_ok = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    let part_ok = part
        .strip_prefix("part")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if *window == "window" && *ytd == "YTD" && name_ok && part_ok {
        Ok(())
    } else {
        Err(ParseError::Shape(format!("found `{target}`")))
    }
}

// ============================================================================
// Raw export structures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Wrapper {
    tweet: RawTweet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTweet {
    #[serde(deserialize_with = "lenient_string")]
    id_str: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    full_text: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    text: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    created_at: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    favorite_count: u64,
    #[serde(deserialize_with = "lenient_u64")]
    retweet_count: u64,
    #[serde(deserialize_with = "lenient_string")]
    in_reply_to_status_id_str: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    in_reply_to_status_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    in_reply_to_user_id_str: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    in_reply_to_user_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    in_reply_to_screen_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    retweeted_status_id_str: Option<String>,
    retweeted_status: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    entities: RawEntities,
    #[serde(deserialize_with = "lenient")]
    extended_entities: RawEntities,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntities {
    #[serde(deserialize_with = "lenient_list")]
    user_mentions: Vec<RawMention>,
    #[serde(deserialize_with = "lenient_list")]
    urls: Vec<RawUrl>,
    #[serde(deserialize_with = "lenient_list")]
    hashtags: Vec<RawHashtag>,
    #[serde(deserialize_with = "lenient_list")]
    media: Vec<RawMedia>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMention {
    #[serde(deserialize_with = "lenient_string")]
    screen_name: Option<String>,
    #[serde(deserialize_with = "lenient_span")]
    indices: Option<Span>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUrl {
    #[serde(deserialize_with = "lenient_string")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    expanded_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    display_url: Option<String>,
    #[serde(deserialize_with = "lenient_span")]
    indices: Option<Span>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHashtag {
    #[serde(deserialize_with = "lenient_string")]
    text: Option<String>,
    #[serde(deserialize_with = "lenient_span")]
    indices: Option<Span>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMedia {
    #[serde(deserialize_with = "lenient_span")]
    indices: Option<Span>,
}

impl RawTweet {
    fn into_record(self) -> Option<PostRecord> {
        let id = self.id_str.or(self.id)?;
        let media_source = if self.entities.media.is_empty() {
            self.extended_entities.media
        } else {
            self.entities.media
        };
        let repost_of = self.retweeted_status_id_str.or_else(|| {
            let status = self.retweeted_status.as_ref()?;
            match status.get("id_str").or_else(|| status.get("id"))? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        });

        let mut dropped = 0usize;
        let entities = EntitySet {
            mentions: self
                .entities
                .user_mentions
                .into_iter()
                .filter_map(|m| match (m.indices, m.screen_name) {
                    (Some(span), Some(handle)) => Some(MentionSpan { span, handle }),
                    _ => {
                        dropped += 1;
                        None
                    }
                })
                .collect(),
            links: self
                .entities
                .urls
                .into_iter()
                .filter_map(|u| {
                    let span = u.indices?;
                    let url = u.url.or_else(|| u.expanded_url.clone())?;
                    Some(LinkSpan {
                        span,
                        url,
                        expanded_url: u.expanded_url,
                        display_url: u.display_url,
                    })
                })
                .collect(),
            hashtags: self
                .entities
                .hashtags
                .into_iter()
                .filter_map(|h| {
                    Some(HashtagSpan {
                        span: h.indices?,
                        tag: h.text?,
                    })
                })
                .collect(),
            media: media_source
                .into_iter()
                .filter_map(|m| m.indices.map(|span| MediaSpan { span }))
                .collect(),
        };
        if dropped > 0 {
            debug!(id = %id, dropped, "dropped mentions without handle or indices");
        }

        Some(PostRecord {
            text: self.full_text.or(self.text).unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
            like_count: self.favorite_count,
            repost_count: self.retweet_count,
            in_reply_to_status_id: self.in_reply_to_status_id_str.or(self.in_reply_to_status_id),
            in_reply_to_user_id: self.in_reply_to_user_id_str.or(self.in_reply_to_user_id),
            in_reply_to_screen_name: self.in_reply_to_screen_name,
            repost_of,
            entities,
            id,
        })
    }
}

// ============================================================================
// Lenient field decoding
// ============================================================================

/// Strings and numbers become text; empty strings, null and anything else
/// become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Counts arrive as `"12"` or `12`; anything unreadable counts as zero.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_as_u64(&Value::deserialize(deserializer)?).unwrap_or(0))
}

/// `["3", "9"]` or `[3, 9]` → `Span { start: 3, end: 9 }`.
fn lenient_span<'de, D>(deserializer: D) -> Result<Option<Span>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let pair = value
        .as_array()
        .and_then(|items| <&[Value; 2]>::try_from(items.as_slice()).ok());
    let Some([start, end]) = pair else {
        return Ok(None);
    };
    let start = value_as_u64(start).and_then(|n| usize::try_from(n).ok());
    let end = value_as_u64(end).and_then(|n| usize::try_from(n).ok());
    Ok(start.zip(end).map(|(start, end)| Span::new(start, end)))
}

/// Decode a nested object, falling back to its default on any mismatch.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode an array element by element, dropping elements that do not fit.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
