//! Browser process launching.

// ============================================================================
// Imports
// ============================================================================

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{Error, Result};
use crate::transport::ProcessEndpoint;

// ============================================================================
// Launcher
// ============================================================================

/// Starts a browser process with startup commands.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Starts `endpoint` with `commands` appended to its arguments.
    ///
    /// Returns once the process is started; it is not waited for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessLaunchFailed`] if the process cannot start.
    async fn launch(&self, endpoint: &ProcessEndpoint, commands: &[String]) -> Result<()>;
}

// ============================================================================
// ProcessLauncher
// ============================================================================

/// Launches a detached child process with null stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, endpoint: &ProcessEndpoint, commands: &[String]) -> Result<()> {
        let mut cmd = Command::new(&endpoint.program);

        cmd.args(endpoint.argv(commands));

        // Suppress stdio
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd
            .spawn()
            .map_err(|e| Error::process_launch_failed(&endpoint.program, e))?;

        info!(
            pid = child.id(),
            program = %endpoint.program.display(),
            "Browser process spawned"
        );

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_fails() {
        let endpoint = ProcessEndpoint::new("/nonexistent/qutebrowser");
        let err = ProcessLauncher
            .launch(&endpoint, &[":open about:blank".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProcessLaunchFailed { .. }));
        assert!(err.to_string().contains("/nonexistent/qutebrowser"));
    }

    #[tokio::test]
    async fn test_existing_program_starts() {
        let endpoint = ProcessEndpoint::new("true");
        ProcessLauncher
            .launch(&endpoint, &["ignored".to_string()])
            .await
            .expect("`true` should start");
    }
}
