//! Browser control facade.
//!
//! The [`Client`] bundles both channels: commands go through a
//! [`CommandSender`] and the configured [`Backend`]; requests and events
//! go through a lazily connected [`RpcSession`].
//!
//! # Example
//!
//! ```no_run
//! use qutebrowser_ipc::{Client, EventKind, OpenTarget};
//!
//! # async fn example() -> qutebrowser_ipc::Result<()> {
//! let client = Client::builder().build()?;
//!
//! client.on(EventKind::UrlChanged, |event| {
//!     println!("{:?}", event.notification.get_str("url"));
//!     Ok(())
//! });
//!
//! client.open_url("https://example.com", OpenTarget::Tab).await?;
//! let windows = client.window_info().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempPath;
use tracing::debug;

use crate::dispatch::{Dispatcher, HandlerEvent, WindowState};
use crate::error::Result;
use crate::identifiers::WinId;
use crate::protocol::{EventKind, command_line, trailing_command_line};
use crate::sender::{Backend, CommandSender, Delivery};
use crate::session::{Connection, RpcSession};

use super::builder::ClientBuilder;

// ============================================================================
// OpenTarget
// ============================================================================

/// Where `:open` puts the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenTarget {
    /// Replace the current tab.
    #[default]
    Current,
    /// New foreground tab.
    Tab,
    /// New background tab.
    Background,
    /// New window.
    Window,
    /// New private window.
    Private,
}

impl OpenTarget {
    /// The `:open` flag for this target, if any.
    #[inline]
    #[must_use]
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Self::Current => None,
            Self::Tab => Some("-t"),
            Self::Background => Some("-b"),
            Self::Window => Some("-w"),
            Self::Private => Some("-p"),
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Command delivery.
    sender: CommandSender,
    /// Strategy used for every command.
    backend: Backend,
    /// Shared with the session's read loop.
    dispatcher: Arc<Dispatcher>,
    /// RPC session, connected on first use.
    session: RpcSession,
    /// Sourced scripts, removed when the client drops.
    scripts: Mutex<Vec<TempPath>>,
}

// ============================================================================
// Client
// ============================================================================

/// Handle to a browser instance.
///
/// Cloning is cheap; clones share the session and window store.
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("backend", &self.inner.backend)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(
        sender: CommandSender,
        backend: Backend,
        dispatcher: Arc<Dispatcher>,
        session: RpcSession,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                sender,
                backend,
                dispatcher,
                session,
                scripts: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the command sender.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> &CommandSender {
        &self.inner.sender
    }

    /// Returns the delivery strategy.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    /// Returns the RPC session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &RpcSession {
        &self.inner.session
    }

    /// Returns the dispatcher.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }
}

// ============================================================================
// Client - Commands
// ============================================================================

impl Client {
    /// Delivers browser commands through the configured backend.
    ///
    /// # Errors
    ///
    /// Returns the delivery error of the backend.
    pub async fn send_commands<I, S>(&self, commands: I) -> Result<Delivery>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands: Vec<String> = commands.into_iter().map(Into::into).collect();
        self.inner.sender.send(&commands, &self.inner.backend).await
    }

    /// Opens `url` in `target`.
    ///
    /// # Errors
    ///
    /// As [`send_commands`](Self::send_commands).
    pub async fn open_url(&self, url: &str, target: OpenTarget) -> Result<Delivery> {
        let line = trailing_command_line("open", target.flag(), url);
        self.send_commands([line]).await
    }

    /// Sources a config file into the browser.
    ///
    /// # Errors
    ///
    /// As [`send_commands`](Self::send_commands).
    pub async fn config_source(&self, path: impl AsRef<Path>) -> Result<Delivery> {
        let path = path.as_ref().to_string_lossy();
        self.send_commands([command_line("config-source", [&*path])])
            .await
    }

    /// Runs Python code inside the browser by sourcing it from a
    /// temporary file.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`](crate::Error::Io) if the file cannot be written
    /// - otherwise as [`send_commands`](Self::send_commands)
    pub async fn execute_python(&self, code: &str) -> Result<Delivery> {
        let mut file = tempfile::Builder::new()
            .prefix("qutebrowser-ipc-")
            .suffix(".py")
            .tempfile()?;
        file.write_all(code.as_bytes())?;
        file.flush()?;

        let script = file.into_temp_path();
        debug!(path = %script.display(), "Sourcing Python snippet");

        let delivery = self.config_source(&script).await;
        self.inner.scripts.lock().push(script);
        delivery
    }

    /// Runs JavaScript in the current tab.
    ///
    /// # Errors
    ///
    /// As [`send_commands`](Self::send_commands).
    pub async fn execute_js(&self, code: &str) -> Result<Delivery> {
        self.send_commands([trailing_command_line("jseval", ["-q"], code)])
            .await
    }
}

// ============================================================================
// Client - RPC
// ============================================================================

impl Client {
    /// Connects the RPC session, optionally closing a live one first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`](crate::Error::Connection) if the
    /// browser's RPC socket stays unavailable.
    pub async fn connect_rpc(&self, flush: bool) -> Result<()> {
        self.inner.session.connect(flush).await.map(|_| ())
    }

    /// Sends a request, connecting first if needed.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`](crate::Error::Connection) if no session
    ///   could be established
    /// - [`Error::Request`](crate::Error::Request) if the browser
    ///   answered with an error
    /// - [`Error::ConnectionLost`](crate::Error::ConnectionLost) if the
    ///   channel closed first
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.connection().await?.request(method, params).await
    }

    /// Sends a notification, connecting first if needed.
    ///
    /// # Errors
    ///
    /// As [`connect_rpc`](Self::connect_rpc).
    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.connection().await?.notify(method, params)
    }

    /// Fetches the state of every window and refreshes the window store.
    ///
    /// # Errors
    ///
    /// As [`request`](Self::request).
    pub async fn window_info(&self) -> Result<Value> {
        self.connection().await?;
        self.inner.session.refresh_windows().await
    }

    /// Closes the RPC session; pending requests fail.
    pub async fn close_rpc(&self) {
        self.inner.session.close().await;
    }

    async fn connection(&self) -> Result<Connection> {
        match self.inner.session.live() {
            Some(connection) => Ok(connection),
            None => self.inner.session.connect(false).await,
        }
    }
}

// ============================================================================
// Client - Events
// ============================================================================

impl Client {
    /// Registers `handler` for notifications of `kind`.
    pub fn on<F>(&self, kind: impl Into<EventKind>, handler: F)
    where
        F: Fn(&HandlerEvent<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.dispatcher.on(kind.into(), handler);
    }

    /// Returns a snapshot of one window's state.
    #[must_use]
    pub fn window_state(&self, win_id: &WinId) -> Option<WindowState> {
        self.inner.dispatcher.window(win_id)
    }

    /// Returns snapshots of every known window.
    #[must_use]
    pub fn windows(&self) -> Vec<WindowState> {
        self.inner.dispatcher.windows()
    }
}

// ============================================================================
// Tests
// ============================================================================
