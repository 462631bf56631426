//! Starting the browser-side RPC backend.
//!
//! The RPC socket only exists once the browser has loaded the backend
//! script. When a session finds no socket it asks a [`Bootstrap`] to load
//! it, waits a grace period, and tries once more.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::protocol::command_line;
use crate::sender::{Backend, CommandSender};

// ============================================================================
// Bootstrap
// ============================================================================

/// Starts the RPC backend inside the browser.
#[async_trait]
pub trait Bootstrap: Send + Sync {
    /// Requests the backend start; does not wait for it to be ready.
    ///
    /// # Errors
    ///
    /// Returns the delivery error if the request could not be made.
    async fn start(&self) -> Result<()>;
}

// ============================================================================
// NoBootstrap
// ============================================================================

/// Bootstrap that does nothing; the session just retries once.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBootstrap;

#[async_trait]
impl Bootstrap for NoBootstrap {
    async fn start(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// ConfigSourceBootstrap
// ============================================================================

/// Loads the backend by sending `:config-source <script>` over the
/// command channel.
#[derive(Debug, Clone)]
pub struct ConfigSourceBootstrap {
    sender: CommandSender,
    backend: Backend,
    script: PathBuf,
}

impl ConfigSourceBootstrap {
    /// Creates a bootstrap that sources `script` through `backend`.
    #[must_use]
    pub fn new(sender: CommandSender, backend: Backend, script: impl Into<PathBuf>) -> Self {
        Self {
            sender,
            backend,
            script: script.into(),
        }
    }

    /// The command this bootstrap sends.
    #[must_use]
    pub fn command(&self) -> String {
        command_line("config-source", [&*self.script.to_string_lossy()])
    }
}

#[async_trait]
impl Bootstrap for ConfigSourceBootstrap {
    async fn start(&self) -> Result<()> {
        info!(script = %self.script.display(), "Starting RPC backend");
        self.sender
            .send(&[self.command()], &self.backend)
            .await
            .map(|_| ())
    }
}

// ============================================================================
// Tests
// ============================================================================
