//! Channel endpoints and default socket locations.
//!
//! The browser listens on two local sockets:
//!
//! | Socket | Default path |
//! |--------|--------------|
//! | Command | `$XDG_RUNTIME_DIR/qutebrowser/ipc-<md5(login name)>` |
//! | RPC | `<tmp>/qutebrowser-rpc` |
//!
//! When no socket answers, commands are delivered by launching the browser
//! executable described by a [`ProcessEndpoint`].

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::path::PathBuf;

use md5::{Digest, Md5};

// ============================================================================
// Constants
// ============================================================================

/// Default browser executable.
pub const DEFAULT_EXECUTABLE: &str = "qutebrowser";

/// File name of the RPC socket inside the temp directory.
pub const RPC_SOCKET_NAME: &str = "qutebrowser-rpc";

/// Environment variables consulted for the login name, in order.
const LOGIN_NAME_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

// ============================================================================
// ProcessEndpoint
// ============================================================================

/// Executable plus fixed leading arguments used to start the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEndpoint {
    /// Program to run.
    pub program: PathBuf,

    /// Arguments placed before the commands.
    pub args: Vec<String>,
}

impl ProcessEndpoint {
    /// Creates an endpoint with no leading arguments.
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends a leading argument.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Full argument vector for delivering `commands` at startup.
    #[must_use]
    pub fn argv(&self, commands: &[String]) -> Vec<String> {
        self.args.iter().chain(commands).cloned().collect()
    }
}

impl Default for ProcessEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE)
    }
}

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the login name of the current user.
///
/// Falls back to `"user"` when none of the usual variables is set.
#[must_use]
pub fn login_name() -> String {
    LOGIN_NAME_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "user".to_string())
}

/// Returns the command socket file name for `user`.
///
/// The browser names its socket `ipc-` followed by the hex md5 of the
/// login name.
#[must_use]
pub fn ipc_socket_name(user: &str) -> String {
    let digest = Md5::digest(user.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("ipc-{hex}")
}

/// Returns the browser's runtime directory for `user`.
#[must_use]
pub fn runtime_dir(user: &str) -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| env::temp_dir().join(format!("runtime-{user}")))
        .join("qutebrowser")
}

/// Default command socket path for the current user.
#[must_use]
pub fn default_command_socket() -> PathBuf {
    let user = login_name();
    runtime_dir(&user).join(ipc_socket_name(&user))
}

/// Default RPC socket path.
#[must_use]
pub fn default_rpc_socket() -> PathBuf {
    env::temp_dir().join(RPC_SOCKET_NAME)
}

// ============================================================================
// Tests
// ============================================================================
