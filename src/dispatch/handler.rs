//! Notification handlers.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::protocol::Notification;

use super::state::WindowState;

// ============================================================================
// HandlerEvent
// ============================================================================

/// What a handler receives for one notification.
#[derive(Debug, Clone, Copy)]
pub struct HandlerEvent<'a> {
    /// The notification, params unchanged.
    pub notification: &'a Notification,

    /// State of the window it concerns, after the merge.
    ///
    /// `None` when the notification carries no `win-id`.
    pub window: Option<&'a WindowState>,
}

// ============================================================================
// Handler
// ============================================================================

/// Callback invoked for notifications of a registered kind.
///
/// Handlers run on the session's read loop, so they should return
/// quickly and hand long work to a spawned task. An `Err` or a panic is
/// logged and does not stop the remaining handlers.
pub trait Handler: Send + Sync {
    /// Handles one notification.
    ///
    /// # Errors
    ///
    /// Any error is logged by the dispatcher and otherwise ignored.
    fn handle(&self, event: &HandlerEvent<'_>) -> Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&HandlerEvent<'_>) -> Result<()> + Send + Sync,
{
    fn handle(&self, event: &HandlerEvent<'_>) -> Result<()> {
        self(event)
    }
}
