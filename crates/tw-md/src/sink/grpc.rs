//! gRPC sink for `sync.SyncService/PushTrade` (see `proto/sync.proto`).
//!
//! Messages and the client stub are generated by `build.rs`.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tracing::info;
use tw_core::NormalizedTradeRecord;
use tw_core::error::{TwError, TwResult};

use self::pb::sync_service_client::SyncServiceClient;
use super::TradeSink;

pub mod pb {
    tonic::include_proto!("sync");
}

impl From<NormalizedTradeRecord> for pb::TradeRequest {
    fn from(r: NormalizedTradeRecord) -> Self {
        Self {
            exchange: r.exchange.as_str().to_string(),
            symbol: r.symbol,
            price: r.price,
            quantity: r.quantity,
            trade_time: r.trade_time,
        }
    }
}

/// Production sink: one `PushTrade` call per record over a lazily connected
/// channel shared by every connector.
#[derive(Clone)]
pub struct GrpcSink {
    client: SyncServiceClient<Channel>,
}

impl GrpcSink {
    /// Build a channel to `addr` (`host:port` or a full `http://` URI) without
    /// connecting; the first push triggers the connection. Must be called
    /// inside a tokio runtime.
    pub fn connect_lazy(addr: &str) -> TwResult<Self> {
        let uri = endpoint_uri(addr);
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| TwError::Config(format!("invalid gRPC address {addr}: {e}")))?
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true);

        info!("[grpc] downstream endpoint {addr} (lazy connect)");
        Ok(Self { client: SyncServiceClient::new(endpoint.connect_lazy()) })
    }
}

fn endpoint_uri(addr: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}

#[async_trait]
impl TradeSink for GrpcSink {
    async fn push(&self, record: NormalizedTradeRecord) -> TwResult<()> {
        let mut client = self.client.clone();
        client
            .push_trade(pb::TradeRequest::from(record))
            .await
            .map(|_| ())
            .map_err(|status| TwError::Push(format!("{:?}: {}", status.code(), status.message())))
    }
}

#[cfg(test)]
mod tests {
    use tw_core::Exchange;

    use super::*;

    #[test]
    fn bare_host_port_gets_a_scheme() {
        assert_eq!(endpoint_uri("127.0.0.1:50051"), "http://127.0.0.1:50051");
        assert_eq!(endpoint_uri("http://sync:50051"), "http://sync:50051");
    }

    #[test]
    fn record_maps_onto_request_fields() {
        let req = pb::TradeRequest::from(NormalizedTradeRecord {
            exchange: Exchange::Bittrex,
            symbol: "BTC-USD".into(),
            price: "43000.5".into(),
            quantity: "0.01".into(),
            trade_time: 1_700_000_000,
        });
        assert_eq!(req.exchange, "bittrex");
        assert_eq!(req.symbol, "BTC-USD");
        assert_eq!(req.price, "43000.5");
        assert_eq!(req.trade_time, 1_700_000_000);
    }

    #[test]
    fn generated_request_uses_the_proto_field_numbers() {
        use prost::Message;

        let req = pb::TradeRequest {
            exchange: "a".into(),
            symbol: "b".into(),
            price: "c".into(),
            quantity: "d".into(),
            trade_time: 1,
        };
        assert_eq!(
            req.encode_to_vec(),
            [0x0a, 1, b'a', 0x12, 1, b'b', 0x1a, 1, b'c', 0x22, 1, b'd', 0x28, 1]
        );
        assert!(pb::Empty {}.encode_to_vec().is_empty());
    }

    #[test]
    fn invalid_address_is_a_config_error() {
        assert!(matches!(GrpcSink::connect_lazy("http://bad host:1"), Err(TwError::Config(_))));
    }

    #[tokio::test]
    async fn push_without_a_server_fails_instead_of_hanging() {
        let sink = GrpcSink::connect_lazy("127.0.0.1:1").unwrap();
        let record = NormalizedTradeRecord {
            exchange: Exchange::Huobi,
            symbol: "btcusdt".into(),
            price: "1".into(),
            quantity: "1".into(),
            trade_time: 0,
        };
        let result = tokio::time::timeout(Duration::from_secs(10), sink.push(record)).await;
        assert!(matches!(result, Ok(Err(TwError::Push(_)))));
    }
}
