//! Fire-and-forget command delivery.
//!
//! [`CommandSender`] runs whichever [`Backend`] it is handed. The only
//! decision it makes itself is the fallback from the socket to a freshly
//! spawned browser when no instance is listening.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{CommandEnvelope, PROTOCOL_VERSION};
use crate::transport::{CommandChannel, ProcessEndpoint};

use super::backend::Backend;
use super::launcher::{Launcher, ProcessLauncher};

// ============================================================================
// Delivery
// ============================================================================

/// Which strategy ended up delivering the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to a running instance's command socket.
    Socket,
    /// Passed to a newly started browser process.
    Spawned,
    /// Appended to the userscript FIFO.
    ExternalScript,
}

// ============================================================================
// CommandSender
// ============================================================================

/// Delivers commands to the browser without waiting for a reply.
#[derive(Clone)]
pub struct CommandSender {
    /// Process used for [`Backend::Socket`] fallback.
    fallback: ProcessEndpoint,
    /// Version written into command envelopes.
    protocol_version: u32,
    /// Starts browser processes.
    launcher: Arc<dyn Launcher>,
}

impl fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("fallback", &self.fallback)
            .field("protocol_version", &self.protocol_version)
            .finish_non_exhaustive()
    }
}

impl Default for CommandSender {
    fn default() -> Self {
        Self::new(ProcessEndpoint::default())
    }
}

impl CommandSender {
    /// Creates a sender that falls back to launching `fallback`.
    #[must_use]
    pub fn new(fallback: ProcessEndpoint) -> Self {
        Self {
            fallback,
            protocol_version: PROTOCOL_VERSION,
            launcher: Arc::new(ProcessLauncher),
        }
    }

    /// Overrides the protocol version written into envelopes.
    #[inline]
    #[must_use]
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    /// Replaces the process launcher.
    #[inline]
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Returns the fallback process endpoint.
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> &ProcessEndpoint {
        &self.fallback
    }

    /// Delivers `commands` through `backend`.
    ///
    /// # Errors
    ///
    /// - [`Error::ProcessLaunchFailed`] if spawning (directly or as the
    ///   socket fallback) fails
    /// - [`Error::Connection`] / [`Error::Write`] if the FIFO cannot be
    ///   opened or written
    pub async fn send(&self, commands: &[String], backend: &Backend) -> Result<Delivery> {
        debug!(backend = backend.name(), count = commands.len(), "Sending commands");

        match backend {
            Backend::Socket(path) => self.send_socket(commands, path).await,
            Backend::Spawn(endpoint) => {
                self.launcher.launch(endpoint, commands).await?;
                Ok(Delivery::Spawned)
            }
            Backend::ExternalScript(fifo) => {
                write_fifo(fifo, commands).await?;
                Ok(Delivery::ExternalScript)
            }
        }
    }

    async fn send_socket(&self, commands: &[String], path: &Path) -> Result<Delivery> {
        match self.write_socket(commands, path).await {
            Ok(()) => Ok(Delivery::Socket),
            Err(e @ (Error::Connection { .. } | Error::Write { .. })) => {
                info!(error = %e, "No running browser instance, starting a new one");
                self.launcher.launch(&self.fallback, commands).await?;
                Ok(Delivery::Spawned)
            }
            Err(e) => Err(e),
        }
    }

    async fn write_socket(&self, commands: &[String], path: &Path) -> Result<()> {
        let payload = CommandEnvelope::new(commands.iter().cloned())
            .with_protocol_version(self.protocol_version)
            .encode()?;

        let mut channel = CommandChannel::open(path).await?;
        let sent = channel.send(payload).await;
        channel.close().await;
        sent
    }
}

/// Appends `commands` to the userscript FIFO, one per line.
async fn write_fifo(fifo: &Path, commands: &[String]) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(fifo)
        .await
        .map_err(|e| Error::connection(fifo, e.to_string()))?;

    let mut buf = String::new();
    for command in commands {
        buf.push_str(command);
        buf.push('\n');
    }

    file.write_all(buf.as_bytes())
        .await
        .map_err(|e| Error::write(e.to_string()))?;
    file.flush().await.map_err(|e| Error::write(e.to_string()))?;

    debug!(fifo = %fifo.display(), count = commands.len(), "Commands written to FIFO");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
