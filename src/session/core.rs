//! RPC session lifecycle.
//!
//! An [`RpcSession`] owns at most one live [`Connection`] and knows how
//! to (re)establish it:
//!
//! ```text
//! Disconnected ──connect──► Connecting ──ok──► Connected
//!       ▲                        │                 │
//!       └────────── failed ──────┘                 │
//!       └──────────── close / browser gone ────────┘
//! ```
//!
//! A failed attempt leaves the session `Disconnected`; the host keeps
//! running and may call [`RpcSession::connect`] again later.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::UnixStream;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::transport::RpcChannel;

use super::bootstrap::{Bootstrap, NoBootstrap};
use super::connection::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Method returning the state of every open window.
pub const WINDOW_INFO_METHOD: &str = "get-window-info";

/// Default wait between bootstrapping the backend and retrying.
pub const DEFAULT_BOOTSTRAP_GRACE: Duration = Duration::from_millis(500);

/// Default limit on the window-info sync after connecting.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SessionState
// ============================================================================

/// Connection state of an [`RpcSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No live connection.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// A live connection exists.
    Connected,
}

// ============================================================================
// RpcSession
// ============================================================================

/// The single RPC session of this process.
pub struct RpcSession {
    /// RPC socket path.
    endpoint: PathBuf,
    /// Receives notifications from every connection.
    dispatcher: Arc<Dispatcher>,
    /// Starts the backend when the socket is missing.
    bootstrap: Arc<dyn Bootstrap>,
    /// Wait after bootstrapping.
    grace: Duration,
    /// Limit on the post-connect window-info sync.
    sync_timeout: Duration,
    /// Set while an attempt is running.
    connecting: Mutex<bool>,
    /// Live connection, if any.
    connection: Mutex<Option<Connection>>,
    /// Serializes connection attempts.
    connect_lock: tokio::sync::Mutex<()>,
}

impl fmt::Debug for RpcSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSession")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RpcSession - Constructor
// ============================================================================

impl RpcSession {
    /// Creates a disconnected session for the socket at `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<PathBuf>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            endpoint: endpoint.into(),
            dispatcher,
            bootstrap: Arc::new(NoBootstrap),
            grace: DEFAULT_BOOTSTRAP_GRACE,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            connecting: Mutex::new(false),
            connection: Mutex::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Sets the bootstrap used when the socket is missing.
    #[inline]
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: Arc<dyn Bootstrap>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Sets the wait between bootstrap and retry.
    #[inline]
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets the limit on the post-connect window-info sync.
    #[inline]
    #[must_use]
    pub fn with_sync_timeout(mut self, sync_timeout: Duration) -> Self {
        self.sync_timeout = sync_timeout;
        self
    }
}

// ============================================================================
// RpcSession - Accessors
// ============================================================================

impl RpcSession {
    /// Returns the RPC socket path.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    /// Returns the dispatcher notifications are routed to.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.live().is_some() {
            SessionState::Connected
        } else if *self.connecting.lock() {
            SessionState::Connecting
        } else {
            SessionState::Disconnected
        }
    }

    /// Returns the live connection, if any.
    #[must_use]
    pub fn live(&self) -> Option<Connection> {
        let mut guard = self.connection.lock();
        match guard.as_ref() {
            Some(connection) if connection.is_alive() => Some(connection.clone()),
            Some(_) => {
                debug!("Dropping dead RPC connection");
                *guard = None;
                None
            }
            None => None,
        }
    }
}

// ============================================================================
// RpcSession - Lifecycle
// ============================================================================

impl RpcSession {
    /// Ensures a live connection exists and returns it.
    ///
    /// With `flush`, any existing connection is closed first. A live
    /// connection is otherwise reused. A new connection is followed by a
    /// [`WINDOW_INFO_METHOD`] request whose result is merged into the
    /// window store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket is still unavailable
    /// after bootstrapping. The session stays usable for a later attempt.
    pub async fn connect(&self, flush: bool) -> Result<Connection> {
        let _attempt = self.connect_lock.lock().await;

        if flush {
            self.close().await;
        }

        if let Some(connection) = self.live() {
            debug!("Reusing live RPC connection");
            return Ok(connection);
        }

        *self.connecting.lock() = true;
        let opened = self.open_channel().await;
        *self.connecting.lock() = false;

        let channel = opened?;
        let connection = Connection::new(channel, Arc::clone(&self.dispatcher));
        *self.connection.lock() = Some(connection.clone());

        info!(endpoint = %self.endpoint.display(), "RPC session connected");

        self.sync_window_info(&connection).await;

        Ok(connection)
    }

    /// Closes the live connection, failing its pending calls.
    ///
    /// Calling it without a connection is a no-op.
    pub async fn close(&self) {
        let connection = self.connection.lock().take();

        if let Some(connection) = connection {
            connection.close().await;
            info!(endpoint = %self.endpoint.display(), "RPC session closed");
        }
    }

    /// Opens the socket, bootstrapping the backend once if needed.
    async fn open_channel(&self) -> Result<RpcChannel<UnixStream>> {
        match RpcChannel::open(&self.endpoint).await {
            Ok(channel) => Ok(channel),
            Err((why, e)) if why.needs_bootstrap() => {
                info!(
                    endpoint = %self.endpoint.display(),
                    reason = ?why,
                    error = %e,
                    "RPC socket unavailable, bootstrapping backend"
                );

                if let Err(e) = self.bootstrap.start().await {
                    warn!(error = %e, "Bootstrap failed");
                }
                sleep(self.grace).await;

                RpcChannel::open(&self.endpoint).await.map_err(|(_, e)| e)
            }
            Err((_, e)) => Err(e),
        }
    }

    async fn sync_window_info(&self, connection: &Connection) {
        match connection
            .request_with_timeout(WINDOW_INFO_METHOD, Value::Null, self.sync_timeout)
            .await
        {
            Ok(info) => {
                let windows = self.dispatcher.sync_all(&info);
                debug!(windows, "Initial window state synced");
            }
            Err(e) => warn!(error = %e, "Initial window info request failed"),
        }
    }
}

// ============================================================================
// RpcSession - Calls
// ============================================================================

impl RpcSession {
    /// Sends a request over the live connection and waits for the result.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if there is no live connection
    /// - [`Error::Request`] if the browser answered with an error
    /// - [`Error::ConnectionLost`] if the channel closed first
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.require_live()?.request(method, params).await
    }

    /// Like [`request`], failing with [`Error::RequestTimeout`] after
    /// `request_timeout`.
    ///
    /// # Errors
    ///
    /// As [`request`].
    ///
    /// [`request`]: RpcSession::request
    pub async fn request_with_timeout(
        &self,
        method: &str,
        params: Value,
        request_timeout: Duration,
    ) -> Result<Value> {
        self.require_live()?
            .request_with_timeout(method, params, request_timeout)
            .await
    }

    /// Sends a notification over the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if there is no live connection.
    pub fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.require_live()?.notify(method, params)
    }

    /// Requests the state of every window and merges it into the store.
    ///
    /// # Errors
    ///
    /// As [`request`](RpcSession::request).
    pub async fn refresh_windows(&self) -> Result<Value> {
        let info = self.request(WINDOW_INFO_METHOD, Value::Null).await?;
        self.dispatcher.sync_all(&info);
        Ok(info)
    }

    fn require_live(&self) -> Result<Connection> {
        self.live()
            .ok_or_else(|| Error::connection(&self.endpoint, "no live RPC session"))
    }
}

// ============================================================================
// Tests
// ============================================================================
