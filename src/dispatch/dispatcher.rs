//! Notification dispatcher.
//!
//! # Dispatch Order
//!
//! For every notification:
//!
//! 1. State sync: the params record is merged into the [`WindowState`]
//!    named by its `win-id` (skipped when there is none).
//! 2. Every handler registered for the notification's [`EventKind`], in
//!    registration order.
//!
//! A kind with no handlers stops after step 1.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::WinId;
use crate::protocol::{EventKind, Notification, keys};

use super::handler::{Handler, HandlerEvent};
use super::state::{WindowState, WindowStore};

// ============================================================================
// Types
// ============================================================================

/// Handlers registered per event kind.
type HandlerMap = FxHashMap<EventKind, Vec<Arc<dyn Handler>>>;

/// Summary of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Window fields written by the state sync.
    pub fields_merged: usize,
    /// Handlers that returned `Ok`.
    pub handled: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes notifications to the window store and registered handlers.
///
/// Shared between the RPC session's read loop and the code registering
/// handlers; all methods take `&self`.
#[derive(Default)]
pub struct Dispatcher {
    /// Window states, written only by the state sync.
    store: Mutex<WindowStore>,
    /// Registered handlers.
    handlers: RwLock<HandlerMap>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("windows", &self.store.lock().len())
            .field("kinds", &self.handlers.read().len())
            .finish()
    }
}

// ============================================================================
// Dispatcher - Registration
// ============================================================================

impl Dispatcher {
    /// Creates a dispatcher with no handlers and no windows.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler object for `kind`.
    ///
    /// Handlers for the same kind run in registration order.
    pub fn register(&self, kind: EventKind, handler: Arc<dyn Handler>) {
        debug!(kind = %kind, "Registering handler");
        self.handlers.write().entry(kind).or_default().push(handler);
    }

    /// Registers a closure for `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&HandlerEvent<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(handler));
    }

    /// Removes every handler registered for `kind`.
    pub fn clear(&self, kind: &EventKind) {
        self.handlers.write().remove(kind);
    }

    /// Returns the number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: &EventKind) -> usize {
        self.handlers.read().get(kind).map_or(0, Vec::len)
    }
}

// ============================================================================
// Dispatcher - Dispatch
// ============================================================================

impl Dispatcher {
    /// Dispatches one notification.
    pub fn dispatch(&self, notification: &Notification) -> DispatchReport {
        let mut report = DispatchReport::default();

        let window = self.sync_state(notification, &mut report);

        // Clone the list so handlers may register more handlers.
        let handlers: Vec<Arc<dyn Handler>> = self
            .handlers
            .read()
            .get(&notification.kind)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            trace!(kind = %notification.kind, "No handlers registered");
            return report;
        }

        let event = HandlerEvent {
            notification,
            window: window.as_ref(),
        };

        for (index, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(&event))) {
                Ok(Ok(())) => report.handled += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(kind = %notification.kind, index, error = %e, "Handler failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        kind = %notification.kind,
                        index,
                        panic = panic_message(payload.as_ref()),
                        "Handler panicked"
                    );
                }
            }
        }

        debug!(
            kind = %notification.kind,
            handled = report.handled,
            failed = report.failed,
            "Notification dispatched"
        );

        report
    }

    /// Merges a full window-info result into the store.
    ///
    /// Accepts a list of records, an object of records keyed by window id,
    /// or a single record. Only the state sync runs; no handlers are
    /// invoked. Returns the number of windows updated.
    pub fn sync_all(&self, info: &Value) -> usize {
        let mut store = self.store.lock();
        let mut updated = 0;

        let mut merge = |fallback_id: Option<&str>, record: &Value| {
            let Some(fields) = record.as_object() else {
                return;
            };
            let win_id = fields
                .get(keys::WIN_ID)
                .and_then(WinId::from_value)
                .or_else(|| fallback_id.map(WinId::from));

            if let Some(win_id) = win_id {
                store.merge(&win_id, fields);
                updated += 1;
            }
        };

        match info {
            Value::Array(records) => records.iter().for_each(|r| merge(None, r)),
            Value::Object(map) if map.contains_key(keys::WIN_ID) => merge(None, info),
            Value::Object(map) => map.iter().for_each(|(id, r)| merge(Some(id.as_str()), r)),
            _ => warn!("Window info is neither a list nor an object"),
        }

        debug!(updated, "Window info synced");
        updated
    }

    fn sync_state(
        &self,
        notification: &Notification,
        report: &mut DispatchReport,
    ) -> Option<WindowState> {
        let win_id = notification.win_id()?;
        let mut store = self.store.lock();

        match notification.record() {
            Some(record) => {
                // `win-id` itself is not a field.
                report.fields_merged = record.len().saturating_sub(1);
                trace!(win_id = %win_id, fields = report.fields_merged, "Merging window fields");
                Some(store.merge(&win_id, record).clone())
            }
            None => store.get(&win_id).cloned(),
        }
    }
}

// ============================================================================
// Dispatcher - Window Store Access
// ============================================================================

impl Dispatcher {
    /// Returns a snapshot of the state for `win_id`.
    #[must_use]
    pub fn window(&self, win_id: &WinId) -> Option<WindowState> {
        self.store.lock().get(win_id).cloned()
    }

    /// Returns snapshots of every tracked window, ordered by id.
    #[must_use]
    pub fn windows(&self) -> Vec<WindowState> {
        let store = self.store.lock();
        store
            .ids()
            .iter()
            .filter_map(|id| store.get(id).cloned())
            .collect()
    }

    /// Stops tracking `win_id`.
    pub fn forget(&self, win_id: &WinId) -> Option<WindowState> {
        self.store.lock().forget(win_id)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// ============================================================================
// Tests
// ============================================================================
