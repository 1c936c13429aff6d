//! Huobi spot trades over the raw gzip WebSocket API.
//!
//! - Catalog: `GET https://api.huobi.pro/v1/common/symbols`
//! - Stream: `wss://api-aws.huobi.pro/ws`, gzip binary frames
//! - One `{"sub","id"}` request per `market.<symbol>.trade.detail` channel
//! - Application-level `{"ping":n}` answered with `{"pong":n}`

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

pub const CATALOG_URL: &str = "https://api.huobi.pro/v1/common/symbols";
pub const WS_URL: &str = "wss://api-aws.huobi.pro/ws";

pub const NAMING: ChannelNaming = ChannelNaming {
    prefix: "market.",
    suffix: ".trade.detail",
    delimiter: '.',
    symbol_segment: 1,
    lowercase: false,
    control_channel: None,
};

pub struct HuobiAdapter {
    profile: ExchangeProfile,
    codec: FrameCodec,
    catalog: MarketCatalog,
    ws: WsConnConfig,
}

impl HuobiAdapter {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self::with_endpoints(config, CATALOG_URL, WS_URL)
    }

    pub fn with_endpoints(config: &ConnectorConfig, catalog_url: &str, ws_url: &str) -> Self {
        let profile = ExchangeProfile {
            exchange: Exchange::Huobi,
            naming: NAMING,
            compression: Compression::Gzip,
            time_unit: TimeUnit::Milliseconds,
            subscribe_batch: 1,
            subscribe_pacing: None,
        };
        Self {
            codec: FrameCodec::new(profile.compression, config.effective_max_message_bytes()),
            catalog: MarketCatalog::new(profile.label(), catalog_url, json_parser::parse_markets),
            ws: WsConnConfig::new(profile.label(), ws_url, config.effective_max_message_bytes()),
            profile,
        }
    }
}

#[async_trait]
impl FeedAdapter for HuobiAdapter {
    fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    async fn fetch_markets(&self) -> TwResult<Vec<Market>> {
        self.catalog.fetch().await
    }

    async fn connect(&self) -> TwResult<Box<dyn Transport>> {
        Ok(Box::new(WsTransport::connect(&self.ws).await?))
    }

    fn encode_subscribe(&self, _request_id: u64, channels: &[&str]) -> String {
        json_parser::build_subscribe(channels.first().copied().unwrap_or_default())
    }

    fn decode(&self, frame: &RawFrame) -> Result<Message, DecodeError> {
        json_parser::parse_message(&self.codec.json(frame)?, &self.profile.naming)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tw_core::{NormalizedTradeRecord, TradeTick};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::codec::compress;

    fn adapter() -> HuobiAdapter {
        HuobiAdapter::new(&ConnectorConfig::for_exchange("huobi"))
    }

    fn gzip_frame(v: serde_json::Value) -> RawFrame {
        RawFrame::compressed(compress(v.to_string().as_bytes(), Compression::Gzip))
    }

    #[test]
    fn compressed_ping_decodes_and_pong_echoes_nonce() {
        let a = adapter();
        let msg = a.decode(&gzip_frame(json!({"ping": 1492420473027_i64}))).unwrap();
        assert_eq!(msg, Message::Keepalive { nonce: Some(1492420473027) });
        assert_eq!(a.encode_pong(1492420473027), r#"{"pong":1492420473027}"#);
    }

    #[test]
    fn compressed_trade_normalizes_to_downstream_record() {
        let a = adapter();
        let frame = RawFrame::compressed(compress(
            br#"{"ch":"market.btcusdt.trade.detail","tick":{"data":[{"price":100.5,"amount":2,"ts":1700000000000}]}}"#,
            Compression::Gzip,
        ));

        let Message::TradeBatch { ticks, .. } = a.decode(&frame).unwrap() else { panic!("expected trades") };
        let tick: &TradeTick = &ticks[0];
        let record = NormalizedTradeRecord::from_tick(a.profile().exchange, a.profile().time_unit, tick);

        assert_eq!(record, NormalizedTradeRecord {
            exchange: Exchange::Huobi,
            symbol: "btcusdt".into(),
            price: "100.5".into(),
            quantity: "2".into(),
            trade_time: 1_700_000_000,
        });
        assert_eq!(record.exchange.as_str(), "huobi");
    }

    #[test]
    fn compressed_ack_decodes() {
        let msg = adapter()
            .decode(&gzip_frame(json!({"id": "market.btcusdt.trade.detail", "status": "ok", "subbed": "market.btcusdt.trade.detail"})))
            .unwrap();
        assert!(matches!(msg, Message::SubscriptionAck(ref acks) if acks[0].success));
    }

    #[test]
    fn subscribe_uses_the_channel_as_id() {
        let text = adapter().encode_subscribe(7, &["market.ethusdt.trade.detail"]);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v, json!({"sub": "market.ethusdt.trade.detail", "id": "market.ethusdt.trade.detail"}));
    }

    #[tokio::test]
    async fn catalog_error_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/common/symbols"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "error", "err-msg": "maintenance"})),
            )
            .mount(&server)
            .await;

        let a = HuobiAdapter::with_endpoints(
            &ConnectorConfig::for_exchange("huobi"),
            &format!("{}/v1/common/symbols", server.uri()),
            WS_URL,
        );
        let err = a.fetch_markets().await.unwrap_err();
        assert!(matches!(err, tw_core::error::TwError::CatalogFetch(ref m) if m.contains("maintenance")));
    }
}
