//! Typed error definitions for the tickwire pipeline.
//!
//! [`TwError`] carries the connector's error taxonomy. Every variant is
//! recoverable at some level of the pipeline: catalog, connect and auth
//! errors are retried by the connector, decode errors drop one frame,
//! subscription errors affect one channel and push errors lose one record.
//! All variants implement `std::error::Error` via `thiserror`, so they
//! integrate with `anyhow::Result` at the binary edge.

use thiserror::Error;

/// Domain-specific errors for the tickwire pipeline.
#[derive(Debug, Error)]
pub enum TwError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Market catalog could not be fetched (network, HTTP status or body).
    #[error("catalog fetch error: {0}")]
    CatalogFetch(String),

    /// Socket or handshake failure while opening a streaming connection.
    #[error("connect error: {0}")]
    Connect(String),

    /// Exchange rejected (or never answered) the authentication request.
    #[error("auth error: {0}")]
    Auth(String),

    /// One inbound frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// One channel's subscription was rejected by the exchange.
    #[error("subscription error on {channel}: {code}")]
    Subscription { channel: String, code: String },

    /// The downstream push of one record failed.
    #[error("push error: {0}")]
    Push(String),

    /// The live streaming connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Reasons a single frame is dropped by the codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Corrupt or truncated compressed payload.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// Payload is not valid UTF-8 after decompression.
    #[error("invalid utf-8 payload")]
    Utf8,

    /// Payload is not valid JSON.
    #[error("malformed json: {0}")]
    Json(String),

    /// Payload parsed but matches none of the known message shapes.
    #[error("unrecognized message: {0}")]
    Unrecognized(String),
}

/// Failures of a live [`Transport`](crate::ws::Transport).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Read or write failed at the socket / protocol level.
    #[error("{0}")]
    Io(String),

    /// A single message exceeded the configured maximum size; the socket
    /// was closed with code 1009.
    #[error("message exceeds {limit} bytes, connection closed")]
    Oversized { limit: usize },

    /// The peer sent a close frame.
    #[error("closed by peer: {0}")]
    Closed(String),
}

/// Shorthand result type used across the workspace.
pub type TwResult<T> = Result<T, TwError>;

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e.to_string())
    }
}
