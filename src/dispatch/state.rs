//! Per-window state assembled from notifications.
//!
//! The browser only ever sends the fields that changed. [`WindowState`]
//! keeps the last value seen for each field; a key absent from an update
//! leaves its field alone, a key present with `null` clears it.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::identifiers::WinId;
use crate::protocol::keys;

// ============================================================================
// WindowState
// ============================================================================

/// Last known state of one browser window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowState {
    /// Window this state belongs to.
    pub win_id: Option<WinId>,
    /// Current URL.
    pub url: Option<String>,
    /// Page title.
    pub title: Option<String>,
    /// URL under the pointer.
    pub hover: Option<String>,
    /// Active search term.
    pub search: Option<String>,
    /// Current key mode.
    pub mode: Option<String>,
    /// Private browsing window.
    pub private: Option<bool>,
    /// Audio played recently.
    pub recently_audible: Option<bool>,
    /// Horizontal scroll percentage.
    pub x_scroll_perc: Option<f64>,
    /// Vertical scroll percentage.
    pub y_scroll_perc: Option<f64>,
    /// Favicon reference.
    pub icon: Option<String>,
    /// Fields without a dedicated slot.
    pub extra: Map<String, Value>,
}

/// Outcome of reading one field from an update.
enum Field<T> {
    /// Key absent.
    Absent,
    /// Key present with a usable value (`None` for `null`).
    Set(Option<T>),
    /// Key present with the wrong type.
    Invalid,
}

impl WindowState {
    /// Creates an empty state for `win_id`.
    #[must_use]
    pub fn new(win_id: WinId) -> Self {
        Self {
            win_id: Some(win_id),
            ..Self::default()
        }
    }

    /// Merges every key present in `record`.
    ///
    /// Returns the number of fields written.
    pub fn merge(&mut self, record: &Map<String, Value>) -> usize {
        let mut written = 0;

        written += apply(&mut self.url, string_field(record, keys::URL), keys::URL);
        written += apply(&mut self.title, string_field(record, keys::TITLE), keys::TITLE);
        written += apply(&mut self.hover, string_field(record, keys::HOVER), keys::HOVER);
        written += apply(&mut self.search, string_field(record, keys::SEARCH), keys::SEARCH);
        written += apply(&mut self.mode, string_field(record, keys::MODE), keys::MODE);
        written += apply(&mut self.icon, string_field(record, keys::ICON), keys::ICON);
        written += apply(&mut self.private, bool_field(record, keys::PRIVATE), keys::PRIVATE);
        written += apply(
            &mut self.recently_audible,
            bool_field(record, keys::RECENTLY_AUDIBLE),
            keys::RECENTLY_AUDIBLE,
        );
        written += apply(
            &mut self.x_scroll_perc,
            number_field(record, keys::X_SCROLL_PERC),
            keys::X_SCROLL_PERC,
        );
        written += apply(
            &mut self.y_scroll_perc,
            number_field(record, keys::Y_SCROLL_PERC),
            keys::Y_SCROLL_PERC,
        );

        for (key, value) in record {
            if !is_known_key(key) {
                self.extra.insert(key.clone(), value.clone());
                written += 1;
            }
        }

        written
    }
}

fn apply<T>(slot: &mut Option<T>, field: Field<T>, key: &str) -> usize {
    match field {
        Field::Absent => 0,
        Field::Set(value) => {
            *slot = value;
            1
        }
        Field::Invalid => {
            warn!(key, "Ignoring window field with unexpected type");
            0
        }
    }
}

fn read_field<T>(
    record: &Map<String, Value>,
    key: &str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Field<T> {
    match record.get(key) {
        None => Field::Absent,
        Some(Value::Null) => Field::Set(None),
        Some(value) => convert(value).map_or(Field::Invalid, |v| Field::Set(Some(v))),
    }
}

fn string_field(record: &Map<String, Value>, key: &str) -> Field<String> {
    read_field(record, key, |v| v.as_str().map(str::to_string))
}

fn bool_field(record: &Map<String, Value>, key: &str) -> Field<bool> {
    read_field(record, key, Value::as_bool)
}

fn number_field(record: &Map<String, Value>, key: &str) -> Field<f64> {
    read_field(record, key, Value::as_f64)
}

fn is_known_key(key: &str) -> bool {
    matches!(
        key,
        keys::WIN_ID
            | keys::URL
            | keys::TITLE
            | keys::HOVER
            | keys::SEARCH
            | keys::MODE
            | keys::ICON
            | keys::PRIVATE
            | keys::RECENTLY_AUDIBLE
            | keys::X_SCROLL_PERC
            | keys::Y_SCROLL_PERC
    )
}

// ============================================================================
// WindowStore
// ============================================================================

/// Window states keyed by window id.
///
/// Entries are created on the first update for an id and never removed
/// here; pruning stale windows is left to the owner via [`forget`].
///
/// [`forget`]: WindowStore::forget
#[derive(Debug, Default)]
pub struct WindowStore {
    windows: FxHashMap<WinId, WindowState>,
}

impl WindowStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `record` into the state for `win_id`, creating it if needed.
    pub fn merge(&mut self, win_id: &WinId, record: &Map<String, Value>) -> &WindowState {
        let state = self.windows.entry(win_id.clone()).or_insert_with(|| {
            debug!(win_id = %win_id, "Tracking new window");
            WindowState::new(win_id.clone())
        });
        state.merge(record);
        state
    }

    /// Returns the state for `win_id`.
    #[inline]
    #[must_use]
    pub fn get(&self, win_id: &WinId) -> Option<&WindowState> {
        self.windows.get(win_id)
    }

    /// Drops the state for `win_id`.
    pub fn forget(&mut self, win_id: &WinId) -> Option<WindowState> {
        self.windows.remove(win_id)
    }

    /// Returns all tracked window ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<WinId> {
        let mut ids: Vec<WinId> = self.windows.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of tracked windows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns `true` if no window is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
