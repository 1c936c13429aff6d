//! Bittrex v3 trades over the SignalR `c3` hub.
//!
//! - Catalog: `GET https://api.bittrex.com/v3/markets`
//! - Stream: SignalR 1.5 at `https://socket-v3.bittrex.com/signalr`
//!   (negotiate, WebSocket `/connect`, then `start`)
//! - One `Subscribe` invocation carrying `heartbeat` and every `trade_<symbol>`
//! - Trade payloads are base64 + raw deflate, decoded in [`json_parser`]
//! - With credentials configured the session is authenticated first and
//!   renewed on `authenticationExpiring`

pub mod auth;
pub mod hub;
pub mod json_parser;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};
use tw_core::config::ConnectorConfig;
use tw_core::error::{DecodeError, TransportError, TwError, TwResult};
use tw_core::time_util::{TimeUnit, now_ms};
use tw_core::ws::{Transport, WsConnConfig, WsTransport};
use tw_core::{Compression, Exchange, Market, Message, RawFrame};

use self::auth::{AUTH_INVOCATION_ID, AuthRequest};
use self::hub::{HubEndpoint, HubFrame};
use crate::adapter::{ExchangeProfile, FeedAdapter};
use crate::catalog::MarketCatalog;
use crate::codec::{ChannelNaming, FrameCodec};

pub const CATALOG_URL: &str = "https://api.bittrex.com/v3/markets";
pub const HUB_URL: &str = "https://socket-v3.bittrex.com/signalr";

const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

pub const NAMING: ChannelNaming = ChannelNaming {
    prefix: "trade_",
    suffix: "",
    delimiter: '_',
    symbol_segment: 1,
    lowercase: false,
    control_channel: Some("heartbeat"),
};

pub struct BittrexAdapter {
    profile: ExchangeProfile,
    codec: FrameCodec,
    catalog: MarketCatalog,
    hub: HubEndpoint,
    /// Template for the socket; the URL is filled in per negotiated token.
    ws: WsConnConfig,
    credentials: Option<(String, String)>,
}

impl BittrexAdapter {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self::with_endpoints(config, CATALOG_URL, HUB_URL)
    }

    pub fn with_endpoints(config: &ConnectorConfig, catalog_url: &str, hub_url: &str) -> Self {
        let profile = ExchangeProfile {
            exchange: Exchange::Bittrex,
            naming: NAMING,
            compression: Compression::Deflate,
            time_unit: TimeUnit::Milliseconds,
            subscribe_batch: usize::MAX,
            subscribe_pacing: None,
        };
        let mut ws = WsConnConfig::new(profile.label(), hub_url, config.effective_max_message_bytes());
        // Compression lives inside hub arguments, not on the socket frames.
        ws.binary_is_compressed = false;
        Self {
            codec: FrameCodec::new(profile.compression, config.effective_max_message_bytes()),
            catalog: MarketCatalog::new(profile.label(), catalog_url, json_parser::parse_markets),
            hub: HubEndpoint::new(hub_url),
            ws,
            credentials: config.credentials(),
            profile,
        }
    }

    fn auth_request(&self) -> TwResult<AuthRequest> {
        let (key, secret) =
            self.credentials.as_ref().ok_or_else(|| TwError::Auth("no API credentials configured".into()))?;
        let nonce = uuid::Uuid::new_v4().to_string();
        AuthRequest::new(key, secret, now_ms() as i64, &nonce)
    }
}

#[async_trait]
impl FeedAdapter for BittrexAdapter {
    fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    async fn fetch_markets(&self) -> TwResult<Vec<Market>> {
        self.catalog.fetch().await
    }

    async fn connect(&self) -> TwResult<Box<dyn Transport>> {
        let token = self.hub.negotiate().await?;
        let ws = WsConnConfig { url: self.hub.connect_url(&token), ..self.ws.clone() };
        let mut transport = WsTransport::connect(&ws).await?;
        if let Err(e) = self.hub.start(&token).await {
            transport.close().await;
            return Err(e);
        }
        debug!("[bittrex] hub started");
        Ok(Box::new(transport))
    }

    fn requires_auth(&self) -> bool {
        self.credentials.is_some()
    }

    async fn authenticate(&self, transport: &mut dyn Transport) -> TwResult<Vec<RawFrame>> {
        let request = self.auth_request()?;
        transport.send_text(hub::invocation("Authenticate", request.args(), AUTH_INVOCATION_ID)).await?;

        let deadline = Instant::now() + AUTH_TIMEOUT;
        let mut backlog = Vec::new();
        loop {
            let frame = match timeout_at(deadline, transport.receive()).await {
                Err(_) => return Err(TwError::Auth(format!("no answer within {AUTH_TIMEOUT:?}"))),
                Ok(None) => return Err(TransportError::Closed("end of stream during auth".into()).into()),
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(frame))) => frame,
            };

            // Frames that are not the auth answer are replayed to the caller.
            let answer = self.codec.json(&frame).ok().and_then(|v| match hub::classify(&v) {
                Ok(HubFrame::Result { id, result }) if id == AUTH_INVOCATION_ID => Some(auth::check_result(result)),
                Ok(HubFrame::Error { id, error }) if id == AUTH_INVOCATION_ID => Some(Err(TwError::Auth(error))),
                _ => None,
            });
            match answer {
                Some(Ok(())) => {
                    info!("[bittrex] session authenticated");
                    return Ok(backlog);
                }
                Some(Err(e)) => return Err(e),
                None => backlog.push(frame),
            }
        }
    }

    fn encode_subscribe(&self, request_id: u64, channels: &[&str]) -> String {
        hub::invocation("Subscribe", json!([channels]), request_id)
    }

    fn decode(&self, frame: &RawFrame) -> Result<Message, DecodeError> {
        json_parser::parse_message(&self.codec.json(frame)?, &self.profile.naming, &self.codec)
    }
}
