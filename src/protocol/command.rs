//! Command channel envelope.
//!
//! The command socket accepts exactly one message per connection: the
//! list of commands the browser should run, as if they had been passed on
//! its command line.
//!
//! # Format
//!
//! ```json
//! {"args": [":open -t https://example.com"], "target_arg": null, "protocol_version": 1}
//! ```
//!
//! `target_arg` is always serialized, as `null` when unset. The browser
//! distinguishes an absent key from an explicit `null`.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Protocol version spoken on the command socket.
pub const PROTOCOL_VERSION: u32 = 1;

// ============================================================================
// CommandEnvelope
// ============================================================================

/// One message on the command channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Commands in execution order.
    pub args: Vec<String>,

    /// Target for URLs in `args` (`tab`, `window`, ...); `null` defers to
    /// the browser's own setting.
    pub target_arg: Option<String>,

    /// Wire protocol version.
    pub protocol_version: u32,
}

impl CommandEnvelope {
    /// Creates an envelope with the default protocol version.
    #[must_use]
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            target_arg: None,
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Overrides the protocol version.
    #[inline]
    #[must_use]
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    /// Sets the target argument.
    #[inline]
    #[must_use]
    pub fn with_target_arg(mut self, target: impl Into<String>) -> Self {
        self.target_arg = Some(target.into());
        self
    }

    /// Serializes the envelope to JSON bytes, without a frame delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses an envelope from JSON bytes.
    ///
    /// A trailing newline is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the bytes are not a command envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode(format!("command envelope: {e}")))
    }
}

// ============================================================================
// Command Strings
// ============================================================================

/// Quotes one argument of a browser command if it needs it.
///
/// Commands without a trailing free-text argument are split shell-style,
/// so arguments containing whitespace or quotes are wrapped in single
/// quotes with embedded single quotes escaped as `'\''`.
#[must_use]
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    let needs_quotes =
        arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));

    if needs_quotes {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    } else {
        Cow::Borrowed(arg)
    }
}

/// Builds `:<name> <args...>` with each argument quoted as needed.
#[must_use]
pub fn command_line<'a>(name: &str, args: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = format!(":{name}");
    for arg in args {
        line.push(' ');
        line.push_str(&quote_arg(arg));
    }
    line
}

/// Builds `:<name> <flags...> <text>` for commands whose last argument
/// takes the rest of the line (`:open`, `:jseval`).
///
/// The browser keeps that text as written, quotes included, so `text` is
/// appended unchanged.
#[must_use]
pub fn trailing_command_line<'a>(
    name: &str,
    flags: impl IntoIterator<Item = &'a str>,
    text: &str,
) -> String {
    let mut line = command_line(name, flags);
    if !text.is_empty() {
        line.push(' ');
        line.push_str(text);
    }
    line
}

// ============================================================================
// Tests
// ============================================================================
