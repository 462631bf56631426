//! Local socket transport layer.
//!
//! This module owns the byte-level side of both browser channels:
//! opening Unix domain sockets, newline framing, and the default socket
//! locations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   command socket (one line)  ┌─────────────────┐
//! │  CommandSender  │─────────────────────────────►│                 │
//! │                 │                              │   qutebrowser   │
//! │  RpcSession     │◄────────────────────────────►│                 │
//! └─────────────────┘   RPC socket (JSON lines)    └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `endpoint` | Socket paths and process endpoints |
//! | `framing` | Newline framing, frame stream |
//! | `socket` | Command and RPC channels |

// ============================================================================
// Submodules
// ============================================================================

/// Socket paths and process endpoints.
pub mod endpoint;

/// Newline framing.
pub mod framing;

/// Command and RPC socket channels.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use endpoint::{ProcessEndpoint, default_command_socket, default_rpc_socket};
pub use framing::{FrameWriter, frame, frames};
pub use socket::{CommandChannel, RpcChannel, Unavailable};
