//! # tw-core
//!
//! Core crate for the tickwire trade relay, providing:
//!
//! - **Types** (`types`): exchanges, markets, frames, decoded messages, trade
//!   ticks, normalized records, subscription bookkeeping
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): the connector's error taxonomy via thiserror
//! - **WebSocket** (`ws`): the `Transport` capability and its WS implementation
//! - **Time utilities** (`time_util`): clocks and trade-time unit normalization
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
