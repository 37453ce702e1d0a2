//! Archive configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; an optional `config.toml` in the export root overrides
//! any subset of keys.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Defaults shown; every key may be omitted
//!
//! title = "Archive"          # Page title and heading
//!
//! [links]
//! profile_base = "https://twitter.com"               # @mention → {profile_base}/{handle}
//! hashtag_base = "https://twitter.com/hashtag/"      # #tag → {hashtag_base}{tag}
//! status_base = "https://twitter.com/i/web/status/"  # permalink → {status_base}{id}
//!
//! [search]
//! debounce_ms = 200          # Quiet time after the last keystroke before searching
//!
//! [colors.light]
//! background = "#ffffff"
//! text = "#14171a"
//! text_muted = "#657786"    # Dates, counters, empty-state message
//! border = "#e1e8ed"
//! link = "#1b6fb3"
//! link_hover = "#0d4f85"
//! accent = "#1d9bf0"        # Active tab, slider
//!
//! [colors.dark]
//! background = "#15202b"
//! text = "#e7e9ea"
//! text_muted = "#8b98a5"
//! border = "#38444d"
//! link = "#6cb8f5"
//! link_hover = "#a6d4fa"
//! accent = "#1d9bf0"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! title = "Tweets 2009–2022"
//! [links]
//! profile_base = "https://x.com"
//! ```
//!
//! A misspelled key is an error rather than a silently ignored setting.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Upper bound for `search.debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 5000;

/// Looked up in the export root.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config.toml: {0}")]
    Io(#[from] std::io::Error),
    #[error("config.toml is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Archive configuration loaded from `config.toml`.
///
/// Every key has a default; a file sets only what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Page title and top heading.
    pub title: String,
    /// Where mentions, hashtags and permalinks point.
    pub links: LinkConfig,
    /// Client-side search behaviour.
    pub search: SearchConfig,
    /// Page palette, one scheme per `prefers-color-scheme`.
    pub colors: ColorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Archive".to_string(),
            links: LinkConfig::default(),
            search: SearchConfig::default(),
            colors: ColorConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Reject empty titles, non-web link bases and oversized debounce windows.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Validation("title must not be empty".into()));
        }
        for (key, value) in [
            ("links.profile_base", &self.links.profile_base),
            ("links.hashtag_base", &self.links.hashtag_base),
            ("links.status_base", &self.links.status_base),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }
        if self.search.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "search.debounce_ms must be 0-{MAX_DEBOUNCE_MS}"
            )));
        }
        Ok(())
    }
}

/// Link targets for rewritten entities and item permalinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Profile root; a mention of `@alice` links to `{profile_base}/alice`.
    pub profile_base: String,
    /// Hashtag search prefix; `#rust` links to `{hashtag_base}rust`.
    pub hashtag_base: String,
    /// Permalink prefix; each item links to `{status_base}{id}`.
    pub status_base: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            profile_base: "https://twitter.com".to_string(),
            hashtag_base: "https://twitter.com/hashtag/".to_string(),
            status_base: "https://twitter.com/i/web/status/".to_string(),
        }
    }
}

/// Client-side search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Milliseconds of typing silence before the search reruns.
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

/// Palettes emitted as `--color-*` custom properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// One palette. Values are passed through to CSS unchecked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    /// Page background (`--color-bg`).
    pub background: String,
    /// Post text.
    pub text: String,
    /// Muted/secondary text color (dates, counters, empty-state message).
    pub text_muted: String,
    /// Item separators and control outlines.
    pub border: String,
    /// Mentions, hashtags, links and permalinks.
    pub link: String,
    pub link_hover: String,
    /// Highlight for the active tab and the likes slider.
    pub accent: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#14171a".to_string(),
            text_muted: "#657786".to_string(),
            border: "#e1e8ed".to_string(),
            link: "#1b6fb3".to_string(),
            link_hover: "#0d4f85".to_string(),
            accent: "#1d9bf0".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#15202b".to_string(),
            text: "#e7e9ea".to_string(),
            text_muted: "#8b98a5".to_string(),
            border: "#38444d".to_string(),
            link: "#6cb8f5".to_string(),
            link_hover: "#a6d4fa".to_string(),
            accent: "#1d9bf0".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// `SiteConfig::default()` as a TOML table, the layer user files merge onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Layer `overlay` onto `base`. Tables merge key by key at every depth; any
/// other overlay value replaces what it lands on.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `<root>/config.toml` as a raw TOML table, or `None` when the export
/// carries no config file.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(root.join(CONFIG_FILE)) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Deserialize `base` with `overlay` merged on top, then validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = if let Some(overlay) = overlay {
        merge_toml(base, overlay)
    } else {
        base
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// The archive config for an export root: stock defaults, overridden by the
/// root's `config.toml` when present.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// The `gen-config` output: every key at its default, with a comment each.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Archive Configuration
# ============================
# Place this file as config.toml in the export root (next to data/).
# Every key is optional; delete the ones you keep at their defaults.
# Values shown below are the defaults. Unknown keys will cause an error.

# Page title and top heading.
title = "Archive"

# ---------------------------------------------------------------------------
# Link targets
# ---------------------------------------------------------------------------
[links]
# @mention links to {profile_base}/{handle}
profile_base = "https://twitter.com"
# #hashtag links to {hashtag_base}{tag}
hashtag_base = "https://twitter.com/hashtag/"
# Each item's permalink is {status_base}{id}
status_base = "https://twitter.com/i/web/status/"

# ---------------------------------------------------------------------------
# Search
# ---------------------------------------------------------------------------
[search]
# Milliseconds of typing silence before the search reruns (0-5000).
debounce_ms = 200

# ---------------------------------------------------------------------------
# Light palette
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
text = "#14171a"
text_muted = "#657786"    # Dates, counters, empty-state message
border = "#e1e8ed"
link = "#1b6fb3"
link_hover = "#0d4f85"
accent = "#1d9bf0"        # Active tab, slider

# ---------------------------------------------------------------------------
# Dark palette, used when the reader's system prefers dark
# ---------------------------------------------------------------------------
[colors.dark]
background = "#15202b"
text = "#e7e9ea"
text_muted = "#8b98a5"
border = "#38444d"
link = "#6cb8f5"
link_hover = "#a6d4fa"
accent = "#1d9bf0"
"##
}

impl ColorScheme {
    /// `(custom property, value)` pairs in stylesheet order.
    fn properties(&self) -> [(&'static str, &str); 7] {
        [
            ("bg", &self.background),
            ("text", &self.text),
            ("text-muted", &self.text_muted),
            ("border", &self.border),
            ("link", &self.link),
            ("link-hover", &self.link_hover),
            ("accent", &self.accent),
        ]
    }

    fn css_block(&self, indent: &str) -> String {
        self.properties()
            .iter()
            .map(|(name, value)| format!("{indent}--color-{name}: {value};\n"))
            .collect()
    }
}

/// `:root` custom properties for the light scheme, overridden under
/// `prefers-color-scheme: dark`.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        ":root {{\n{}}}\n\n@media (prefers-color-scheme: dark) {{\n    :root {{\n{}    }}\n}}",
        colors.light.css_block("    "),
        colors.dark.css_block("        "),
    )
}
