//! Attached media lookup and copying.
//!
//! The export keeps attachments in one flat folder next to the data files
//! (`data/tweets_media/`). A file belongs to the post whose identifier
//! followed by `-` prefixes its name (see [`crate::naming`]). The index keeps
//! the sorted file names and answers lookups by that prefix, so any
//! identifier the reader accepts finds its files. Generation copies them to
//! `<output>/media/` and items reference them relative to the page.

use crate::naming::parse_media_name;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Folder names the export has used for post attachments.
pub const MEDIA_DIR_NAMES: &[&str] = &["tweets_media", "tweet_media"];

/// Folder under the output directory that receives the copied files.
pub const OUTPUT_MEDIA_DIR: &str = "media";

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read media folder: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Attachment file names, looked up by owning post identifier.
#[derive(Debug, Clone, Default)]
pub struct MediaIndex {
    source_dir: Option<PathBuf>,
    files: BTreeSet<String>,
}

impl MediaIndex {
    /// Find the media folder under `data_dir` and index it.
    ///
    /// A missing folder yields an empty index.
    pub fn scan(data_dir: &Path) -> Result<Self, MediaError> {
        match MEDIA_DIR_NAMES
            .iter()
            .map(|name| data_dir.join(name))
            .find(|dir| dir.is_dir())
        {
            Some(dir) => Self::from_dir(&dir),
            None => Ok(Self::default()),
        }
    }

    /// Index every `<identifier>-<name>` file directly inside `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, MediaError> {
        let mut index = Self {
            source_dir: Some(dir.to_path_buf()),
            files: BTreeSet::new(),
        };
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                debug!(path = %entry.path().display(), "skipping non UTF-8 media file name");
                continue;
            };
            if parse_media_name(file_name).is_some() {
                index.insert(file_name);
            } else {
                debug!(file = file_name, "skipping media file without owner prefix");
            }
        }
        Ok(index)
    }

    /// Add an attachment file name.
    pub fn insert(&mut self, file_name: &str) {
        self.files.insert(file_name.to_string());
    }

    /// File names starting with `<id>-`, in name order.
    pub fn files_for(&self, id: &str) -> Vec<&str> {
        let prefix = format!("{id}-");
        self.files
            .range(prefix.clone()..)
            .take_while(|name| name.starts_with(&prefix))
            .map(String::as_str)
            .collect()
    }

    /// Page-relative paths (`media/<file>`) of the files attached to `id`.
    pub fn paths_for(&self, id: &str) -> Vec<String> {
        self.files_for(id)
            .into_iter()
            .map(|name| format!("{OUTPUT_MEDIA_DIR}/{name}"))
            .collect()
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    /// Copy the files owned by `ids` into `<output_dir>/media/`.
    ///
    /// Returns the number of files copied.
    pub fn copy_to<'a, I>(&self, ids: I, output_dir: &Path) -> Result<usize, MediaError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(source_dir) = &self.source_dir else {
            return Ok(0);
        };
        let target_dir = output_dir.join(OUTPUT_MEDIA_DIR);
        let mut copied = 0;
        for id in ids {
            for name in self.files_for(id) {
                if copied == 0 {
                    fs::create_dir_all(&target_dir)?;
                }
                fs::copy(source_dir.join(name), target_dir.join(name))?;
                copied += 1;
            }
        }
        Ok(copied)
    }
}
