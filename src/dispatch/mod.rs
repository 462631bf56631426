//! Notification dispatch and window state.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Dispatcher`] | Runs the state sync, then per-kind handlers |
//! | [`Handler`] | Callback registered for an event kind |
//! | [`WindowState`] | Last known fields of one browser window |
//! | [`WindowStore`] | Window states keyed by window id |
//!
//! # Example
//!
//! ```ignore
//! use qutebrowser_ipc::{Dispatcher, EventKind};
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.on(EventKind::UrlChanged, |event| {
//!     if let Some(url) = event.window.and_then(|w| w.url.as_deref()) {
//!         println!("now at {url}");
//!     }
//!     Ok(())
//! });
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Notification dispatcher.
pub mod dispatcher;

/// Handler trait.
pub mod handler;

/// Window state store.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::{DispatchReport, Dispatcher};
pub use handler::{Handler, HandlerEvent};
pub use state::{WindowState, WindowStore};
