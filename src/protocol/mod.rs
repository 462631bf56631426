//! Wire message types for both browser channels.
//!
//! This module defines the envelopes exchanged with the browser and their
//! JSON codecs. Framing (the trailing newline) is the transport's job.
//!
//! # Channels
//!
//! | Envelope | Channel | Direction |
//! |----------|---------|-----------|
//! | [`CommandEnvelope`] | Command socket | Local → Browser |
//! | [`RpcEnvelope::Request`] | RPC socket | Both |
//! | [`RpcEnvelope::Response`] | RPC socket | Both |
//! | [`RpcEnvelope::Notification`] | RPC socket | Browser → Local |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command envelope and codec |
//! | `event` | Event kinds and decoded notifications |
//! | `rpc` | JSON-RPC envelopes and codec |

// ============================================================================
// Submodules
// ============================================================================

/// Command channel envelope.
pub mod command;

/// Event kinds and notification records.
pub mod event;

/// JSON-RPC envelopes.
pub mod rpc;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    CommandEnvelope, PROTOCOL_VERSION, command_line, quote_arg, trailing_command_line,
};
pub use event::{EventKind, Notification, keys};
pub use rpc::{
    INTERNAL_ERROR, METHOD_NOT_FOUND, RpcEnvelope, RpcError, RpcNotification, RpcRequest,
    RpcResponse,
};
