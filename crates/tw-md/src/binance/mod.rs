//! Binance spot aggregated trades.
//!
//! - Catalog: `GET https://api.binance.com/api/v3/exchangeInfo`
//! - Stream: combined stream `wss://stream.binance.com:9443/stream`, plain JSON
//! - `SUBSCRIBE` requests carry up to 200 `<symbol>@aggTrade` channels each,
//!   sent 250 ms apart to stay under the 5 messages/s inbound limit
//! - Protocol pings are answered by the transport

pub mod json_parser;

use std::time::Duration;

use async_trait::async_trait;
use tw_core::config::ConnectorConfig;
use tw_core::error::{DecodeError, TwResult};
use tw_core::time_util::TimeUnit;
use tw_core::ws::{Transport, WsConnConfig, WsTransport};
use tw_core::{Compression, Exchange, Market, Message, RawFrame};

use crate::adapter::{ExchangeProfile, FeedAdapter};
use crate::catalog::MarketCatalog;
use crate::codec::{ChannelNaming, FrameCodec};

pub const CATALOG_URL: &str = "https://api.binance.com/api/v3/exchangeInfo";
pub const WS_URL: &str = "wss://stream.binance.com:9443/stream";

/// Channels per `SUBSCRIBE` request.
pub const SUBSCRIBE_BATCH: usize = 200;

pub const NAMING: ChannelNaming = ChannelNaming {
    prefix: "",
    suffix: "@aggTrade",
    delimiter: '@',
    symbol_segment: 0,
    lowercase: true,
    control_channel: None,
};

pub struct BinanceAdapter {
    profile: ExchangeProfile,
    codec: FrameCodec,
    catalog: MarketCatalog,
    ws: WsConnConfig,
}

impl BinanceAdapter {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self::with_endpoints(config, CATALOG_URL, WS_URL)
    }

    pub fn with_endpoints(config: &ConnectorConfig, catalog_url: &str, ws_url: &str) -> Self {
        let profile = ExchangeProfile {
            exchange: Exchange::Binance,
            naming: NAMING,
            compression: Compression::None,
            time_unit: TimeUnit::Milliseconds,
            subscribe_batch: SUBSCRIBE_BATCH,
            subscribe_pacing: Some(Duration::from_millis(250)),
        };
        let mut ws = WsConnConfig::new(profile.label(), ws_url, config.effective_max_message_bytes());
        ws.binary_is_compressed = false;
        Self {
            codec: FrameCodec::new(profile.compression, config.effective_max_message_bytes()),
            catalog: MarketCatalog::new(profile.label(), catalog_url, json_parser::parse_markets),
            ws,
            profile,
        }
    }
}

#[async_trait]
impl FeedAdapter for BinanceAdapter {
    fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    async fn fetch_markets(&self) -> TwResult<Vec<Market>> {
        self.catalog.fetch().await
    }

    async fn connect(&self) -> TwResult<Box<dyn Transport>> {
        Ok(Box::new(WsTransport::connect(&self.ws).await?))
    }

    fn encode_subscribe(&self, request_id: u64, channels: &[&str]) -> String {
        json_parser::build_subscribe(request_id, channels)
    }

    fn decode(&self, frame: &RawFrame) -> Result<Message, DecodeError> {
        json_parser::parse_message(&self.codec.json(frame)?, &self.profile.naming)
    }
}
