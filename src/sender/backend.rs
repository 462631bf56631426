//! Command delivery strategies.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::path::PathBuf;

use crate::transport::ProcessEndpoint;

// ============================================================================
// Constants
// ============================================================================

/// Variable the browser sets when it runs the host as a userscript.
pub const FIFO_ENV_VAR: &str = "QUTE_FIFO";

// ============================================================================
// Backend
// ============================================================================

/// How commands reach the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Write a command envelope to the browser's command socket.
    ///
    /// Falls back to [`Backend::Spawn`] when no instance is listening.
    Socket(PathBuf),

    /// Start the browser with the commands as arguments.
    Spawn(ProcessEndpoint),

    /// Append the commands, one per line, to the FIFO the browser handed
    /// to a userscript.
    ExternalScript(PathBuf),
}

impl Backend {
    /// Picks the backend for the current process.
    ///
    /// Inside a userscript (`QUTE_FIFO` set) commands go to the FIFO,
    /// otherwise to `command_socket`.
    #[must_use]
    pub fn from_env(command_socket: impl Into<PathBuf>) -> Self {
        match env::var_os(FIFO_ENV_VAR).filter(|v| !v.is_empty()) {
            Some(fifo) => Self::ExternalScript(PathBuf::from(fifo)),
            None => Self::Socket(command_socket.into()),
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Socket(_) => "socket",
            Self::Spawn(_) => "spawn",
            Self::ExternalScript(_) => "external-script",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
