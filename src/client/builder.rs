//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//! Every setting has a default, so `Client::builder().build()` works on a
//! standard installation.
//!
//! # Example
//!
//! ```no_run
//! use qutebrowser_ipc::Client;
//!
//! # fn example() -> qutebrowser_ipc::Result<()> {
//! let client = Client::builder()
//!     .executable("/usr/bin/qutebrowser")
//!     .bootstrap_script("/usr/share/qutebrowser-ipc/rpc.py")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::PROTOCOL_VERSION;
use crate::sender::{Backend, CommandSender, Launcher};
use crate::session::{
    Bootstrap, ConfigSourceBootstrap, DEFAULT_BOOTSTRAP_GRACE, DEFAULT_SYNC_TIMEOUT, NoBootstrap,
    RpcSession,
};
use crate::transport::endpoint::DEFAULT_EXECUTABLE;
use crate::transport::{ProcessEndpoint, default_command_socket, default_rpc_socket};

use super::core::Client;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ClientBuilder {
    /// Command socket path.
    command_socket: Option<PathBuf>,
    /// RPC socket path.
    rpc_socket: Option<PathBuf>,
    /// Browser executable used for spawning.
    executable: PathBuf,
    /// Arguments placed before the commands when spawning.
    spawn_args: Vec<String>,
    /// Version written into command envelopes.
    protocol_version: u32,
    /// Explicit delivery strategy.
    backend: Option<Backend>,
    /// Script sourced to start the RPC backend.
    bootstrap_script: Option<PathBuf>,
    /// Wait between bootstrap and retry.
    bootstrap_grace: Duration,
    /// Limit on the window-info sync after connecting.
    sync_timeout: Duration,
    /// Process launcher override.
    launcher: Option<Arc<dyn Launcher>>,
    /// Bootstrap override.
    bootstrap: Option<Arc<dyn Bootstrap>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("command_socket", &self.command_socket)
            .field("rpc_socket", &self.rpc_socket)
            .field("executable", &self.executable)
            .field("spawn_args", &self.spawn_args)
            .field("protocol_version", &self.protocol_version)
            .field("backend", &self.backend)
            .field("bootstrap_script", &self.bootstrap_script)
            .field("bootstrap_grace", &self.bootstrap_grace)
            .finish_non_exhaustive()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            command_socket: None,
            rpc_socket: None,
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            spawn_args: Vec::new(),
            protocol_version: PROTOCOL_VERSION,
            backend: None,
            bootstrap_script: None,
            bootstrap_grace: DEFAULT_BOOTSTRAP_GRACE,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            launcher: None,
            bootstrap: None,
        }
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the command socket path.
    ///
    /// Defaults to `$XDG_RUNTIME_DIR/qutebrowser/ipc-<md5 of login name>`.
    #[inline]
    #[must_use]
    pub fn command_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.command_socket = Some(path.into());
        self
    }

    /// Sets the RPC socket path.
    ///
    /// Defaults to `qutebrowser-rpc` in the temporary directory.
    #[inline]
    #[must_use]
    pub fn rpc_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.rpc_socket = Some(path.into());
        self
    }

    /// Sets the browser executable used when no instance is running.
    #[inline]
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    /// Adds arguments passed to a spawned browser before the commands.
    #[must_use]
    pub fn spawn_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spawn_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the command protocol version.
    #[inline]
    #[must_use]
    pub fn protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    /// Forces a delivery strategy instead of picking one from the
    /// environment.
    #[inline]
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the script sourced into the browser to start its RPC backend.
    #[inline]
    #[must_use]
    pub fn bootstrap_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.bootstrap_script = Some(path.into());
        self
    }

    /// Sets the wait between starting the backend and reconnecting.
    #[inline]
    #[must_use]
    pub fn bootstrap_grace(mut self, grace: Duration) -> Self {
        self.bootstrap_grace = grace;
        self
    }

    /// Sets the limit on the window-info request made after connecting.
    #[inline]
    #[must_use]
    pub fn sync_timeout(mut self, sync_timeout: Duration) -> Self {
        self.sync_timeout = sync_timeout;
        self
    }

    /// Replaces the process launcher.
    #[must_use]
    pub fn launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Some(Arc::new(launcher));
        self
    }

    /// Replaces the bootstrap; takes precedence over
    /// [`bootstrap_script`](Self::bootstrap_script).
    #[must_use]
    pub fn bootstrap(mut self, bootstrap: impl Bootstrap + 'static) -> Self {
        self.bootstrap = Some(Arc::new(bootstrap));
        self
    }

    /// Builds the client with validation.
    ///
    /// Nothing is connected yet; the RPC session connects on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the protocol version is 0
    /// - [`Error::Config`] if the executable is empty
    pub fn build(self) -> Result<Client> {
        self.validate()?;

        let fallback = ProcessEndpoint {
            program: self.executable,
            args: self.spawn_args,
        };

        let mut sender = CommandSender::new(fallback).with_protocol_version(self.protocol_version);
        if let Some(launcher) = self.launcher {
            sender = sender.with_launcher(launcher);
        }

        let command_socket = self.command_socket;
        let backend = self.backend.unwrap_or_else(|| {
            Backend::from_env(command_socket.unwrap_or_else(default_command_socket))
        });

        let bootstrap: Arc<dyn Bootstrap> = match (self.bootstrap, self.bootstrap_script) {
            (Some(bootstrap), _) => bootstrap,
            (None, Some(script)) => Arc::new(ConfigSourceBootstrap::new(
                sender.clone(),
                backend.clone(),
                script,
            )),
            (None, None) => Arc::new(NoBootstrap),
        };

        let dispatcher = Arc::new(Dispatcher::new());
        let session = RpcSession::new(
            self.rpc_socket.unwrap_or_else(default_rpc_socket),
            Arc::clone(&dispatcher),
        )
        .with_bootstrap(bootstrap)
        .with_grace(self.bootstrap_grace)
        .with_sync_timeout(self.sync_timeout);

        Ok(Client::new(sender, backend, dispatcher, session))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates settings that have no usable fallback.
    fn validate(&self) -> Result<()> {
        if self.protocol_version == 0 {
            return Err(Error::config(
                "Protocol version must be at least 1. Use .protocol_version() to set it.",
            ));
        }

        if self.executable.as_os_str().is_empty() {
            return Err(Error::config(
                "Browser executable is empty. Use .executable() to set it.\n\
                 Example: Client::builder().executable(\"/usr/bin/qutebrowser\")",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
