//! Frames and decoded messages.
//!
//! A [`RawFrame`] is what a transport hands over; the per-exchange codec turns
//! it into one [`Message`].

use bytes::Bytes;

use super::trade::TradeTick;

/// One undecoded message received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub payload: Bytes,
    /// The payload is in the exchange's compressed wire format and must be
    /// decompressed before parsing.
    pub compressed: bool,
}

impl RawFrame {
    /// A plain text frame.
    pub fn text(s: impl Into<String>) -> Self {
        Self { payload: Bytes::from(s.into()), compressed: false }
    }

    /// A binary frame carrying a compressed payload.
    pub fn compressed(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into(), compressed: true }
    }
}

/// Identifies which subscription(s) an acknowledgement refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckKey {
    /// By channel name (the raw-channel protocol echoes it as the request id).
    Channel(String),
    /// By position within one multi-channel request (hub invocation results).
    Slot { request: u64, index: usize },
    /// Every channel carried by one request.
    Request(u64),
}

/// The exchange's answer for one subscription key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAck {
    pub key: AckKey,
    pub success: bool,
    pub error_code: Option<String>,
}

impl ChannelAck {
    pub fn ok(key: AckKey) -> Self {
        Self { key, success: true, error_code: None }
    }

    pub fn failed(key: AckKey, code: impl Into<String>) -> Self {
        Self { key, success: false, error_code: Some(code.into()) }
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Liveness probe. A present `nonce` must be echoed back as a pong; a
    /// `None` nonce needs no reply.
    Keepalive { nonce: Option<i64> },
    /// Subscription outcome(s).
    SubscriptionAck(Vec<ChannelAck>),
    /// One or more fills; each tick is forwarded independently.
    TradeBatch { channel: String, ticks: Vec<TradeTick> },
    /// The authenticated session is about to expire and must be renewed.
    AuthExpiring,
}
