//! Command channel facade.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CommandSender`] | Runs a backend, falls back from socket to spawn |
//! | [`Backend`] | Delivery strategy (socket, spawn, userscript FIFO) |
//! | [`Launcher`] | Starts browser processes |
//!
//! # Example
//!
//! ```no_run
//! use qutebrowser_ipc::sender::{Backend, CommandSender};
//! use qutebrowser_ipc::transport::default_command_socket;
//!
//! # async fn example() -> qutebrowser_ipc::Result<()> {
//! let sender = CommandSender::default();
//! let backend = Backend::from_env(default_command_socket());
//! sender
//!     .send(&[":open -t https://example.com".to_string()], &backend)
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Delivery strategies.
pub mod backend;

/// Command sender.
pub mod core;

/// Process launching.
pub mod launcher;

// ============================================================================
// Re-exports
// ============================================================================

pub use backend::{Backend, FIFO_ENV_VAR};
pub use self::core::{CommandSender, Delivery};
pub use launcher::{Launcher, ProcessLauncher};
