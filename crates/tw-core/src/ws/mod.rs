//! Streaming transport capability and its WebSocket implementation.
//!
//! Every exchange protocol (raw JSON/gzip sockets, hub RPC over a socket)
//! reaches the pipeline through the same [`Transport`] interface, so the
//! connection state machine is written once.

pub mod client;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::RawFrame;

pub use client::{WsConnConfig, WsTransport};

/// One open streaming connection.
///
/// The transport is owned by a single task; `&mut self` on every method is
/// what serializes writes (keepalive replies, subscribe requests) with reads.
#[async_trait]
pub trait Transport: Send {
    /// Write one text message.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next data frame. `None` means the stream ended.
    async fn receive(&mut self) -> Option<Result<RawFrame, TransportError>>;

    /// Close the connection; errors are logged, not returned.
    async fn close(&mut self);
}
