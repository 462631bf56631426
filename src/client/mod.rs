//! Client facade and configuration.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Commands, RPC calls and event handlers for one browser |
//! | [`ClientBuilder`] | Fluent configuration with validation |
//! | [`OpenTarget`] | Where `:open` puts a page |

// ============================================================================
// Submodules
// ============================================================================

/// Client builder.
pub mod builder;

/// Client facade.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use self::core::{Client, OpenTarget};
