//! JSON-RPC session with the browser.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RpcSession`] | Connect, bootstrap, reconnect, close |
//! | [`Connection`] | Event loop with request correlation |
//! | [`Bootstrap`] | Starts the browser-side backend |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use qutebrowser_ipc::dispatch::Dispatcher;
//! use qutebrowser_ipc::session::RpcSession;
//! use qutebrowser_ipc::transport::default_rpc_socket;
//!
//! # async fn example() -> qutebrowser_ipc::Result<()> {
//! let session = RpcSession::new(default_rpc_socket(), Arc::new(Dispatcher::new()));
//! session.connect(false).await?;
//! let info = session.request("get-window-info", serde_json::Value::Null).await?;
//! println!("{info}");
//! session.close().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Backend bootstrapping.
pub mod bootstrap;

/// Connection event loop.
pub mod connection;

/// Session lifecycle.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use bootstrap::{Bootstrap, ConfigSourceBootstrap, NoBootstrap};
pub use connection::Connection;
pub use self::core::{
    DEFAULT_BOOTSTRAP_GRACE, DEFAULT_SYNC_TIMEOUT, RpcSession, SessionState, WINDOW_INFO_METHOD,
};
