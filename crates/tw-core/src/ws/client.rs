//! Single WebSocket connection implementing [`Transport`].
//!
//! A `WsTransport` is one physical socket for one connection generation:
//! 1. Connects to the exchange endpoint (TLS).
//! 2. Hands text and binary frames to the caller as [`RawFrame`]s.
//! 3. Answers protocol-level ping frames itself.
//! 4. Closes the socket with code 1009 when a message exceeds the configured
//!    maximum size, reporting [`TransportError::Oversized`].
//!
//! Reconnection is not handled here; the connection manager drops the
//! transport and opens a new one.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::Transport;
use crate::error::{TransportError, TwError};
use crate::types::RawFrame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for a single WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsConnConfig {
    /// Full WebSocket URL (e.g. `wss://api-aws.huobi.pro/ws`).
    pub url: String,
    /// Largest accepted message; larger ones close the connection.
    pub max_message_bytes: usize,
    /// Binary frames carry the exchange's compressed wire format.
    pub binary_is_compressed: bool,
    /// Log prefix (e.g. `"huobi"`).
    pub label: String,
}

impl WsConnConfig {
    pub fn new(label: impl Into<String>, url: impl Into<String>, max_message_bytes: usize) -> Self {
        Self { url: url.into(), max_message_bytes, binary_is_compressed: true, label: label.into() }
    }
}

/// A live WebSocket connection.
pub struct WsTransport {
    stream: WsStream,
    label: String,
    max_message_bytes: usize,
    binary_is_compressed: bool,
}

impl WsTransport {
    /// Open the socket. Handshake and TLS failures become [`TwError::Connect`].
    pub async fn connect(config: &WsConnConfig) -> Result<Self, TwError> {
        let request =
            config.url.as_str().into_client_request().map_err(|e| TwError::Connect(format!("bad url: {e}")))?;

        let ws_config = WebSocketConfig::default()
            .max_message_size(Some(config.max_message_bytes))
            .max_frame_size(Some(config.max_message_bytes));

        let (stream, _response) = tokio_tungstenite::connect_async_with_config(request, Some(ws_config), false)
            .await
            .map_err(|e| TwError::Connect(e.to_string()))?;

        debug!("[{}] websocket handshake complete: {}", config.label, config.url);

        Ok(Self {
            stream,
            label: config.label.clone(),
            max_message_bytes: config.max_message_bytes,
            binary_is_compressed: config.binary_is_compressed,
        })
    }

    async fn close_oversized(&mut self) {
        let frame = CloseFrame { code: CloseCode::Size, reason: "message too big".into() };
        if let Err(e) = self.stream.close(Some(frame)).await {
            debug!("[{}] close after oversized message failed: {e}", self.label);
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text.into())).await.map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn receive(&mut self) -> Option<Result<RawFrame, TransportError>> {
        loop {
            let msg = self.stream.next().await?;
            match msg {
                Ok(Message::Text(text)) => {
                    return Some(Ok(RawFrame { payload: Bytes::copy_from_slice(text.as_bytes()), compressed: false }));
                }
                Ok(Message::Binary(data)) => {
                    return Some(Ok(RawFrame { payload: data, compressed: self.binary_is_compressed }));
                }
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        return Some(Err(TransportError::Io(e.to_string())));
                    }
                }
                Ok(Message::Close(frame)) => {
                    let reason =
                        frame.map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str())).unwrap_or_default();
                    return Some(Err(TransportError::Closed(reason)));
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(WsError::Capacity(e)) => {
                    warn!("[{}] message too big ({e}), closing connection", self.label);
                    self.close_oversized().await;
                    return Some(Err(TransportError::Oversized { limit: self.max_message_bytes }));
                }
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("[{}] close failed: {e}", self.label);
        }
    }
}
