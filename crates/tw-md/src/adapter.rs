//! The per-exchange protocol seam.
//!
//! A [`FeedAdapter`] knows one exchange's wire protocol: where its market list
//! lives, how to open a stream, how to encode subscribe requests and how to
//! decode frames. Everything else (reconnects, ack bookkeeping, forwarding)
//! lives in the generic engine and is written once.

use std::time::Duration;

use async_trait::async_trait;
use tw_core::error::{DecodeError, TwResult};
use tw_core::time_util::TimeUnit;
use tw_core::ws::Transport;
use tw_core::{Compression, Exchange, Market, RawFrame};

use crate::codec::ChannelNaming;

/// Static facts about an exchange protocol.
#[derive(Debug, Clone)]
pub struct ExchangeProfile {
    pub exchange: Exchange,
    pub naming: ChannelNaming,
    pub compression: Compression,
    /// Unit of the trade timestamps the exchange sends.
    pub time_unit: TimeUnit,
    /// Channels carried by one subscribe request.
    pub subscribe_batch: usize,
    /// Pause between consecutive subscribe requests.
    pub subscribe_pacing: Option<Duration>,
}

impl ExchangeProfile {
    /// Log prefix.
    pub fn label(&self) -> &'static str {
        self.exchange.as_str()
    }
}

/// One exchange's protocol.
#[async_trait]
pub trait FeedAdapter: Send + Sync + 'static {
    fn profile(&self) -> &ExchangeProfile;

    /// Fetch the tradable markets. Failures are [`TwError::CatalogFetch`](tw_core::error::TwError::CatalogFetch).
    async fn fetch_markets(&self) -> TwResult<Vec<Market>>;

    /// Open a new stream. Every call is a new connection generation.
    async fn connect(&self) -> TwResult<Box<dyn Transport>>;

    /// Whether `authenticate` must run before subscribing.
    fn requires_auth(&self) -> bool {
        false
    }

    /// Authenticate the session on an open transport.
    ///
    /// Frames that arrive while waiting for the answer are returned so the
    /// caller can dispatch them.
    async fn authenticate(&self, _transport: &mut dyn Transport) -> TwResult<Vec<RawFrame>> {
        Ok(Vec::new())
    }

    /// Encode one subscribe request carrying `channels`.
    fn encode_subscribe(&self, request_id: u64, channels: &[&str]) -> String;

    /// Reply to a keepalive carrying `nonce`.
    fn encode_pong(&self, nonce: i64) -> String {
        format!("{{\"pong\":{nonce}}}")
    }

    fn decode(&self, frame: &RawFrame) -> Result<tw_core::Message, DecodeError>;
}
