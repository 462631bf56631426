//! Browser notifications.
//!
//! Every notification (and inbound request) read off the RPC channel is
//! turned into a [`Notification`]: the method name, the [`EventKind`]
//! derived from it, and the untouched params record.
//!
//! # Event Kinds
//!
//! | Method | Kind |
//! |--------|------|
//! | `url-changed` | [`EventKind::UrlChanged`] |
//! | `title-changed` | [`EventKind::TitleChanged`] |
//! | `icon-changed` | [`EventKind::IconChanged`] |
//! | `search` | [`EventKind::Search`] |
//! | `link-hovered` | [`EventKind::LinkHovered`] |
//! | `load-started` | [`EventKind::LoadStarted`] |
//! | `load-finished` | [`EventKind::LoadFinished`] |
//! | `entered-mode` | [`EventKind::EnteredMode`] |
//! | `left-mode` | [`EventKind::LeftMode`] |
//! | `recently-audible-changed` | [`EventKind::RecentlyAudibleChanged`] |
//! | `scroll-perc-changed` | [`EventKind::ScrollPercChanged`] |
//! | `new-window` | [`EventKind::NewWindow`] |
//! | `window-closed` | [`EventKind::WindowClosed`] |
//!
//! Method names are normalized before lookup: lowercased, underscores
//! replaced by hyphens. Anything else becomes [`EventKind::Other`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value};

use crate::identifiers::WinId;

// ============================================================================
// Record Keys
// ============================================================================

/// Keys recognized in a notification record.
pub mod keys {
    /// Window identifier.
    pub const WIN_ID: &str = "win-id";
    /// Current URL.
    pub const URL: &str = "url";
    /// Page title.
    pub const TITLE: &str = "title";
    /// Favicon reference.
    pub const ICON: &str = "icon";
    /// Active search term.
    pub const SEARCH: &str = "search";
    /// URL under the pointer.
    pub const HOVER: &str = "hover";
    /// Private browsing flag.
    pub const PRIVATE: &str = "private";
    /// Current key mode.
    pub const MODE: &str = "mode";
    /// Recently audible flag.
    pub const RECENTLY_AUDIBLE: &str = "recently-audible";
    /// Horizontal scroll percentage.
    pub const X_SCROLL_PERC: &str = "x-scroll-perc";
    /// Vertical scroll percentage.
    pub const Y_SCROLL_PERC: &str = "y-scroll-perc";
}

// ============================================================================
// EventKind
// ============================================================================

/// Kind of a browser notification, derived from its method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Tab URL changed.
    UrlChanged,
    /// Tab title changed.
    TitleChanged,
    /// Favicon changed.
    IconChanged,
    /// Search term changed.
    Search,
    /// Pointer entered or left a link.
    LinkHovered,
    /// Page load started.
    LoadStarted,
    /// Page load finished.
    LoadFinished,
    /// Key mode entered.
    EnteredMode,
    /// Key mode left.
    LeftMode,
    /// Audio state changed.
    RecentlyAudibleChanged,
    /// Scroll position changed.
    ScrollPercChanged,
    /// A window was opened.
    NewWindow,
    /// A window was closed.
    WindowClosed,
    /// Any other method, by normalized name.
    Other(String),
}

impl EventKind {
    /// Derives the kind from a method name.
    #[must_use]
    pub fn from_method(method: &str) -> Self {
        let name = method.trim().to_ascii_lowercase().replace('_', "-");

        match name.as_str() {
            "url-changed" => Self::UrlChanged,
            "title-changed" => Self::TitleChanged,
            "icon-changed" => Self::IconChanged,
            "search" => Self::Search,
            "link-hovered" => Self::LinkHovered,
            "load-started" => Self::LoadStarted,
            "load-finished" => Self::LoadFinished,
            "entered-mode" => Self::EnteredMode,
            "left-mode" => Self::LeftMode,
            "recently-audible-changed" => Self::RecentlyAudibleChanged,
            "scroll-perc-changed" => Self::ScrollPercChanged,
            "new-window" => Self::NewWindow,
            "window-closed" => Self::WindowClosed,
            _ => Self::Other(name),
        }
    }

    /// Returns the canonical method name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::UrlChanged => "url-changed",
            Self::TitleChanged => "title-changed",
            Self::IconChanged => "icon-changed",
            Self::Search => "search",
            Self::LinkHovered => "link-hovered",
            Self::LoadStarted => "load-started",
            Self::LoadFinished => "load-finished",
            Self::EnteredMode => "entered-mode",
            Self::LeftMode => "left-mode",
            Self::RecentlyAudibleChanged => "recently-audible-changed",
            Self::ScrollPercChanged => "scroll-perc-changed",
            Self::NewWindow => "new-window",
            Self::WindowClosed => "window-closed",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(method: &str) -> Self {
        Self::from_method(method)
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A decoded notification handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Method name as received.
    pub method: String,

    /// Kind derived from the method.
    pub kind: EventKind,

    /// Params exactly as received.
    pub params: Value,
}

impl Notification {
    /// Creates a notification, deriving its kind.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let method = method.into();
        let kind = EventKind::from_method(&method);
        Self {
            method,
            kind,
            params,
        }
    }

    /// Returns the flat key-value record, if the params are an object.
    #[inline]
    #[must_use]
    pub fn record(&self) -> Option<&Map<String, Value>> {
        self.params.as_object()
    }

    /// Returns the window this notification concerns, if any.
    #[inline]
    #[must_use]
    pub fn win_id(&self) -> Option<WinId> {
        self.get(keys::WIN_ID).and_then(WinId::from_value)
    }

    /// Returns a raw field.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Returns a string field.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns a boolean field.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }
}

// ============================================================================
// Tests
// ============================================================================
