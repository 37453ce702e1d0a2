//! Filter, sort and search model of the archive page.
//!
//! The page runs `static/archive.js`; this module is the same state machine
//! in Rust. The generator uses it to render the initial state (which items
//! start hidden, whether the empty-state message shows) so the page is right
//! before the script runs, and the tests use it to pin down the rules the
//! script follows.
//!
//! ## Shape
//!
//! One [`FilterState`] value, one pure transition [`Runtime::recompute`].
//! Events only update the state; nothing else is mutable. Search input is
//! the one exception to "recompute immediately": it arms a [`Debounce`] that
//! every newer keystroke restarts, and the recompute happens when it fires.

use crate::index::{Archive, ArchiveStats};
use crate::search::{matches, stems};
use crate::types::{ItemType, SearchIndexEntry};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Seconds from a day's midnight to its last second.
const DAY_END_OFFSET: i64 = 24 * 60 * 60 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Newest first.
    #[default]
    Date,
    /// Most liked first.
    Likes,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Date => "date",
            SortMode::Likes => "likes",
        }
    }
}

/// Everything the viewer can change. Reset on every page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub active_type: ItemType,
    pub query: String,
    /// First day shown, inclusive. `None` leaves the range open.
    pub date_from: Option<NaiveDate>,
    /// Last day shown, inclusive through 23:59:59 UTC.
    pub date_to: Option<NaiveDate>,
    pub min_likes: u64,
    pub sort: SortMode,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            active_type: ItemType::Post,
            query: String::new(),
            date_from: None,
            date_to: None,
            min_likes: 0,
            sort: SortMode::Date,
        }
    }
}

impl FilterState {
    /// Page-load state: defaults with the date inputs set to the archive's
    /// first and last day.
    pub fn for_stats(stats: &ArchiveStats) -> Self {
        let mut state = Self::default();
        if stats.total > 0 {
            state.date_from = utc_day(stats.min_timestamp);
            state.date_to = utc_day(stats.max_timestamp);
        }
        state
    }
}

/// UTC calendar day of an epoch timestamp.
pub fn utc_day(timestamp: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|t| t.date_naive())
}

fn day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// What the page reads off each rendered item.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeItem {
    pub id: String,
    pub item_type: ItemType,
    pub timestamp: i64,
    pub likes: u64,
    stems: Vec<String>,
}

impl RuntimeItem {
    pub fn new(entry: &SearchIndexEntry, likes: u64) -> Self {
        Self {
            id: entry.id.clone(),
            item_type: entry.item_type,
            timestamp: entry.timestamp,
            likes,
            stems: stems(&entry.text),
        }
    }

    fn is_visible(&self, state: &FilterState, query: &[String]) -> bool {
        self.item_type == state.active_type
            && state.date_from.is_none_or(|d| self.timestamp >= day_start(d))
            && state
                .date_to
                .is_none_or(|d| self.timestamp <= day_start(d) + DAY_END_OFFSET)
            && self.likes >= state.min_likes
            && matches(query, &self.stems)
    }
}

/// Result of one recompute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recomputed {
    /// Visible identifiers, in display order.
    pub visible: Vec<String>,
    /// Every identifier, in display order. Hidden items keep their slot.
    pub ordered: Vec<String>,
    /// Nothing is visible: show the empty-state message.
    pub empty: bool,
}

/// The item list in render order (newest first, as the page lays it out).
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    items: Vec<RuntimeItem>,
}

impl Runtime {
    pub fn new(items: Vec<RuntimeItem>) -> Self {
        Self { items }
    }

    /// Items in render order, paired with their search entries.
    pub fn from_archive(archive: &Archive) -> Self {
        let items = archive
            .items
            .iter()
            .zip(&archive.search_index)
            .map(|(item, entry)| RuntimeItem::new(entry, item.likes()))
            .collect();
        Self { items }
    }

    /// Apply `state` to the whole list.
    ///
    /// Sorting always starts from render order, so equal keys keep it no
    /// matter what order earlier recomputes produced.
    pub fn recompute(&self, state: &FilterState) -> Recomputed {
        let query = stems(&state.query);
        let mut order: Vec<&RuntimeItem> = self.items.iter().collect();
        match state.sort {
            SortMode::Date => order.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            SortMode::Likes => order.sort_by(|a, b| b.likes.cmp(&a.likes)),
        }

        let visible: Vec<String> = order
            .iter()
            .filter(|item| item.is_visible(state, &query))
            .map(|item| item.id.clone())
            .collect();
        Recomputed {
            empty: visible.is_empty(),
            visible,
            ordered: order.into_iter().map(|item| item.id.clone()).collect(),
        }
    }
}

/// Quiescence timer for search input.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm the timer, replacing any pending deadline.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// True once, when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A viewer interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SelectType(ItemType),
    Query(String),
    DateFrom(Option<NaiveDate>),
    DateTo(Option<NaiveDate>),
    MinLikes(u64),
    Sort(SortMode),
}

/// The page: state, timer and the last recompute.
#[derive(Debug, Clone)]
pub struct Viewer {
    runtime: Runtime,
    state: FilterState,
    debounce: Debounce,
    current: Recomputed,
}

impl Viewer {
    pub fn new(runtime: Runtime, state: FilterState, debounce: Duration) -> Self {
        let current = runtime.recompute(&state);
        Self {
            runtime,
            state,
            debounce: Debounce::new(debounce),
            current,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn current(&self) -> &Recomputed {
        &self.current
    }

    /// Apply an event. Returns the new result when it recomputed right away.
    pub fn handle(&mut self, event: Event, now: Instant) -> Option<&Recomputed> {
        match event {
            Event::Query(query) => {
                self.state.query = query;
                self.debounce.touch(now);
                return None;
            }
            Event::SelectType(item_type) => self.state.active_type = item_type,
            Event::DateFrom(date) => self.state.date_from = date,
            Event::DateTo(date) => self.state.date_to = date,
            Event::MinLikes(likes) => self.state.min_likes = likes,
            Event::Sort(sort) => self.state.sort = sort,
        }
        Some(self.refresh())
    }

    /// Run the pending search recompute if its window has passed.
    pub fn tick(&mut self, now: Instant) -> Option<&Recomputed> {
        if self.debounce.fire(now) {
            Some(self.refresh())
        } else {
            None
        }
    }

    fn refresh(&mut self) -> &Recomputed {
        self.current = self.runtime.recompute(&self.state);
        &self.current
    }
}
