//! Kraken spot trades over the public v1 WebSocket API.
//!
//! - Catalog: `GET https://api.kraken.com/0/public/AssetPairs`; pairs are
//!   addressed by their websocket name (`XBT/USD`)
//! - Stream: `wss://ws.kraken.com`, plain JSON text frames
//! - One `subscribe` event carrying every pair; each pair is answered by its
//!   own `subscriptionStatus`
//! - Trade times are fractional seconds and arrive already floored

pub mod json_parser;

use async_trait::async_trait;
use tw_core::config::ConnectorConfig;
use tw_core::error::{DecodeError, TwResult};
use tw_core::time_util::TimeUnit;
use tw_core::ws::{Transport, WsConnConfig, WsTransport};
use tw_core::{Compression, Exchange, Market, Message, RawFrame};

use crate::adapter::{ExchangeProfile, FeedAdapter};
use crate::catalog::MarketCatalog;
use crate::codec::{ChannelNaming, FrameCodec};

pub const CATALOG_URL: &str = "https://api.kraken.com/0/public/AssetPairs";
pub const WS_URL: &str = "wss://ws.kraken.com";

/// Channel names are internal (`trade:XBT/USD`); the wire only carries pairs.
pub const NAMING: ChannelNaming = ChannelNaming {
    prefix: "trade:",
    suffix: "",
    delimiter: ':',
    symbol_segment: 1,
    lowercase: false,
    control_channel: None,
};

pub struct KrakenAdapter {
    profile: ExchangeProfile,
    codec: FrameCodec,
    catalog: MarketCatalog,
    ws: WsConnConfig,
}

impl KrakenAdapter {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self::with_endpoints(config, CATALOG_URL, WS_URL)
    }

    pub fn with_endpoints(config: &ConnectorConfig, catalog_url: &str, ws_url: &str) -> Self {
        let profile = ExchangeProfile {
            exchange: Exchange::Kraken,
            naming: NAMING,
            compression: Compression::None,
            time_unit: TimeUnit::Seconds,
            subscribe_batch: usize::MAX,
            subscribe_pacing: None,
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
impl FeedAdapter for KrakenAdapter {
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
        let pairs: Vec<&str> = channels.iter().filter_map(|ch| self.profile.naming.symbol_of(ch)).collect();
        json_parser::build_subscribe(request_id, &pairs)
    }

    fn decode(&self, frame: &RawFrame) -> Result<Message, DecodeError> {
        json_parser::parse_message(&self.codec.json(frame)?, &self.profile.naming)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tw_core::{NormalizedTradeRecord, SubscriptionSet};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::subscription::SubscriptionManager;
    use crate::testkit::ScriptedTransport;

    fn adapter() -> KrakenAdapter {
        KrakenAdapter::new(&ConnectorConfig::for_exchange("kraken"))
    }

    #[test]
    fn trade_normalizes_to_downstream_record() {
        let a = adapter();
        let frame =
            RawFrame::text(r#"[0,[["5541.20000","0.15850568","1534614057.921597","s","l",""]],"trade","XBT/USD"]"#);
        let Message::TradeBatch { ticks, .. } = a.decode(&frame).unwrap() else { panic!("expected trades") };
        let record = NormalizedTradeRecord::from_tick(a.profile().exchange, a.profile().time_unit, &ticks[0]);
        assert_eq!(record, NormalizedTradeRecord {
            exchange: Exchange::Kraken,
            symbol: "XBT/USD".into(),
            price: "5541.20000".into(),
            quantity: "0.15850568".into(),
            trade_time: 1_534_614_057,
        });
    }

    #[tokio::test]
    async fn every_pair_goes_out_in_one_subscribe_event() {
        let a = adapter();
        let markets = vec![Market::new("XBT/USD"), Market::new("ETH/EUR")];

        let manager = SubscriptionManager::new(a.profile());
        let mut set = SubscriptionSet::new(manager.build_subscriptions(&markets));
        let (mut transport, probe) = ScriptedTransport::new(vec![]);
        assert_eq!(manager.send(&a, &mut transport, &mut set).await.unwrap(), 1);

        let sent: Vec<Value> = probe.sent_json();
        assert_eq!(sent, [json!({
            "event": "subscribe",
            "reqid": 1,
            "pair": ["XBT/USD", "ETH/EUR"],
            "subscription": {"name": "trade"}
        })]);

        let ack = a
            .decode(&RawFrame::text(r#"{"event":"subscriptionStatus","pair":"ETH/EUR","status":"subscribed"}"#))
            .unwrap();
        let Message::SubscriptionAck(acks) = ack else { panic!("expected an ack") };
        manager.record(&mut set, &acks[0]);
        assert_eq!(set.summary().confirmed, 1);
    }

    #[tokio::test]
    async fn catalog_is_fetched_from_asset_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/0/public/AssetPairs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": [], "result": {
                "XETHZEUR": {"altname": "ETHEUR", "wsname": "ETH/EUR", "base": "XETH", "quote": "ZEUR"}
            }})))
            .mount(&server)
            .await;

        let a = KrakenAdapter::with_endpoints(
            &ConnectorConfig::for_exchange("kraken"),
            &format!("{}/0/public/AssetPairs", server.uri()),
            WS_URL,
        );
        let markets = a.fetch_markets().await.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].symbol, "ETH/EUR");
    }
}
