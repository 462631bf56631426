//! Error types for the qutebrowser bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use qutebrowser_ipc::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.open_url("https://example.com", OpenTarget::Tab).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Channel | [`Error::Connection`], [`Error::Write`], [`Error::ConnectionLost`] |
//! | Protocol | [`Error::Decode`], [`Error::Request`], [`Error::RequestTimeout`] |
//! | Process | [`Error::ProcessLaunchFailed`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;

use crate::identifiers::CallId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// A channel could not be opened.
    ///
    /// Returned when the socket path does not exist, refuses connections,
    /// or no live RPC session is available.
    #[error("Connection failed ({endpoint}): {message}")]
    Connection {
        /// Socket path or executable that could not be reached.
        endpoint: PathBuf,
        /// Description of the connection error.
        message: String,
    },

    /// The channel was open but writing to it failed.
    #[error("Write failed: {message}")]
    Write {
        /// Description of the write failure.
        message: String,
    },

    /// The RPC channel closed while a call was outstanding.
    #[error("Connection lost")]
    ConnectionLost,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed inbound frame.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of what could not be decoded.
        message: String,
    },

    /// Well-formed error response from the browser.
    #[error("Request {method} failed ({code}): {message}")]
    Request {
        /// Method of the failed request.
        method: String,
        /// JSON-RPC error code reported by the peer.
        code: i64,
        /// Error message reported by the peer.
        message: String,
        /// Optional structured error data.
        data: Option<Value>,
    },

    /// No response arrived within a caller-imposed deadline.
    #[error("Request {call_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The call that timed out.
        call_id: CallId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Process Errors
    // ========================================================================
    /// Failed to launch the browser process.
    #[error("Failed to launch {program}: {message}")]
    ProcessLaunchFailed {
        /// Program that failed to start.
        program: PathBuf,
        /// Description of the launch failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error for the given endpoint.
    #[inline]
    pub fn connection(endpoint: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Creates a write error.
    #[inline]
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a request error from a peer error response.
    #[inline]
    pub fn request(
        method: impl Into<String>,
        code: i64,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self::Request {
            method: method.into(),
            code,
            message: message.into(),
            data,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(call_id: CallId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            call_id,
            timeout_ms,
        }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(program: impl AsRef<Path>, err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            program: program.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the channel could not be opened.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if an outstanding call was abandoned.
    ///
    /// Caller-imposed timeouts count as a lost connection.
    #[inline]
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost | Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this error may succeed on a later attempt.
    ///
    /// The browser may simply not be running yet.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionLost | Self::RequestTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
