//! qutebrowser IPC - drive a running qutebrowser from an editor.
//!
//! This library talks to the browser over two independent local channels:
//!
//! - **Command channel**: one-shot delivery of browser commands to the
//!   instance's command socket, falling back to starting a new browser
//!   when none is running, or to the userscript FIFO when the host runs
//!   as a userscript.
//! - **RPC channel**: a persistent newline-delimited JSON-RPC 2.0
//!   connection carrying synchronous requests, asynchronous notifications
//!   and requests initiated by the browser.
//!
//! Key design principles:
//!
//! - One read loop per connection owns the socket and resolves every
//!   pending request, by response or by failure when the channel dies
//! - Notifications update a per-window state store before any handler
//!   runs
//! - A failing or panicking handler never stops the read loop
//!
//! # Quick Start
//!
//! ```no_run
//! use qutebrowser_ipc::{Client, EventKind, OpenTarget, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .bootstrap_script("/usr/share/qutebrowser-ipc/rpc.py")
//!         .build()?;
//!
//!     client.on(EventKind::TitleChanged, |event| {
//!         println!("title: {:?}", event.notification.get_str("title"));
//!         Ok(())
//!     });
//!
//!     client.open_url("https://example.com", OpenTarget::Tab).await?;
//!     client.connect_rpc(false).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] facade and [`ClientBuilder`] |
//! | [`dispatch`] | Notification dispatch and window state |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Window and call identifiers |
//! | [`protocol`] | Command and JSON-RPC message types |
//! | [`sender`] | Command delivery strategies |
//! | [`session`] | RPC session and connection event loop |
//! | [`transport`] | Sockets, framing and default endpoints |

// ============================================================================
// Modules
// ============================================================================

/// Client facade and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Notification dispatch and per-window state.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Window and call identifiers.
pub mod identifiers;

/// Command and JSON-RPC message types.
pub mod protocol;

/// Command delivery.
pub mod sender;

/// JSON-RPC session.
pub mod session;

/// Socket transport layer.
///
/// Unix sockets, newline framing and default socket paths.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, OpenTarget};

// Dispatch types
pub use dispatch::{DispatchReport, Dispatcher, Handler, HandlerEvent, WindowState};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CallId, WinId};

// Protocol types
pub use protocol::{EventKind, Notification};

// Delivery types
pub use sender::{Backend, CommandSender, Delivery};

// Session types
pub use session::{Bootstrap, RpcSession, SessionState};
