//! # Simple Archive
//!
//! Turns a personal Twitter data export into one self-contained, searchable
//! HTML page. Your export is the data source: posts come from the export's
//! data files, attachments from its media folder, and the result is a single
//! `index.html` that filters, sorts and searches without a server.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Load      export/   →  PostRecords + MediaIndex   (files → structured data)
//! 2. Index     records   →  Archive                    (classify, rewrite, sort, index)
//! 3. Generate  Archive   →  dist/                      (one HTML page + media/)
//! ```
//!
//! Everything is rebuilt from scratch on every run. Stage 2 is a pure
//! function of its inputs, so the interesting logic (rewriting, classifying,
//! ordering, search) is tested without touching the filesystem.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`export`] | Stage 1: strict parser for the export's `window.YTD…` data files |
//! | [`media`] | Stage 1: attachment lookup by post identifier, copying into the output |
//! | [`index`] | Stage 2: builds the render list, stats and search index |
//! | [`rewrite`] | Entity spans (mentions, links, hashtags, media) → escaped markup |
//! | [`classify`] | Post / reply / retweet classification |
//! | [`search`] | Tokenizer, stemmer and containment matcher |
//! | [`runtime`] | Filter/sort/search state machine mirrored by the page script |
//! | [`generate`] | Stage 3: renders the page with Maud and writes the output directory |
//! | [`config`] | `config.toml` loading, validation, merging, and CSS generation |
//! | [`types`] | Records, entity spans and items shared between stages |
//! | [`naming`] | `<identifier>-<name>` media filename convention |
//! | [`output`] | CLI output formatting for each stage |
//!
//! # Design Decisions
//!
//! ## Parse, Don't Execute
//!
//! The export's data files are JavaScript assignments. They are never run:
//! [`export::parse_data_script`] accepts exactly `window.YTD.<name>.partN =
//! [ ... ]` and hands the array to `serde_json`. Anything else is an error
//! before a single byte of output is written.
//!
//! ## Escape Everything That Isn't Markup We Built
//!
//! The rewriter escapes all literal text, not just the pieces that end up in
//! attributes. Existing character references are left alone, so the
//! export's own `&amp;` does not become `&amp;amp;`.
//!
//! ## One State, One Transition
//!
//! The page's filter state is a single value and `recompute` is the only
//! function that reads it. [`runtime`] holds the Rust model of that machine;
//! the generator runs it once to render the initial state, and
//! `static/archive.js` runs the same rules in the browser.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time HTML
//! macro system. Malformed markup is a build error, interpolation is escaped
//! by default, and there is no template directory to ship.
//!
//! ## Best-Effort Archive
//!
//! A post with an unparseable date is dropped and counted, a malformed span
//! is skipped, an empty export produces an empty page. Only problems with
//! the source as a whole (missing directory, wrong file shape, bad config)
//! stop the build.

pub mod classify;
pub mod config;
pub mod export;
pub mod generate;
pub mod index;
pub mod media;
pub mod naming;
pub mod output;
pub mod rewrite;
pub mod runtime;
pub mod search;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
