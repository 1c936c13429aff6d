//! SignalR classic (protocol 1.5) hub plumbing for the `c3` hub.
//!
//! Connecting takes three steps: `negotiate` (HTTP) returns a connection
//! token, the WebSocket is opened on `/connect` with that token, then `start`
//! (HTTP) activates the transport. Over the socket, client invocations are
//! `{"H","M","A","I"}` objects answered by `{"R","I"}` or `{"E","I"}`, and
//! server pushes arrive as `{"C","M":[{"H","M","A"}]}`.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;
use tw_core::error::{DecodeError, TwError, TwResult};

use crate::json_util::{parse_i64, preview};

pub const HUB: &str = "c3";
pub const CLIENT_PROTOCOL: &str = "1.5";

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP and WebSocket endpoints of one SignalR deployment.
#[derive(Debug, Clone)]
pub struct HubEndpoint {
    base: String,
}

impl HubEndpoint {
    /// `base` is the SignalR root, e.g. `https://socket-v3.bittrex.com/signalr`.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into().trim_end_matches('/').to_string() }
    }

    fn connection_data() -> String {
        urlencoding::encode(&json!([{ "name": HUB }]).to_string()).into_owned()
    }

    pub fn negotiate_url(&self) -> String {
        format!("{}/negotiate?clientProtocol={CLIENT_PROTOCOL}&connectionData={}", self.base, Self::connection_data())
    }

    pub fn connect_url(&self, token: &str) -> String {
        let ws_base = if let Some(rest) = self.base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base.clone()
        };
        format!(
            "{ws_base}/connect?transport=webSockets&clientProtocol={CLIENT_PROTOCOL}&connectionToken={}&connectionData={}&tid=10",
            urlencoding::encode(token),
            Self::connection_data()
        )
    }

    pub fn start_url(&self, token: &str) -> String {
        format!(
            "{}/start?transport=webSockets&clientProtocol={CLIENT_PROTOCOL}&connectionToken={}&connectionData={}",
            self.base,
            urlencoding::encode(token),
            Self::connection_data()
        )
    }

    /// Negotiate a connection token.
    pub async fn negotiate(&self) -> TwResult<String> {
        let body = get_json(&self.negotiate_url()).await?;
        if body.get("TryWebSockets").and_then(Value::as_bool) == Some(false) {
            return Err(TwError::Connect("hub does not offer websockets".into()));
        }
        body.get("ConnectionToken")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                TwError::Connect(format!("negotiate without ConnectionToken: {}", preview(&body.to_string())))
            })
    }

    /// Activate the transport after the socket is open.
    pub async fn start(&self, token: &str) -> TwResult<()> {
        let body = get_json(&self.start_url(token)).await?;
        match body.get("Response").and_then(Value::as_str) {
            Some("started") => Ok(()),
            _ => Err(TwError::Connect(format!("hub start refused: {}", preview(&body.to_string())))),
        }
    }
}

async fn get_json(url: &str) -> TwResult<Value> {
    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| TwError::Connect(format!("http client: {e}")))?;
    debug!("[bittrex] GET {url}");
    let resp = client.get(url).send().await.map_err(|e| TwError::Connect(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(TwError::Connect(format!("hub returned HTTP {status}")));
    }
    resp.json().await.map_err(|e| TwError::Connect(format!("malformed hub response: {e}")))
}

/// Encode a hub method invocation.
pub fn invocation(method: &str, args: Value, id: u64) -> String {
    json!({ "H": HUB, "M": method, "A": args, "I": id }).to_string()
}

/// Shape of one hub frame.
#[derive(Debug, PartialEq)]
pub enum HubFrame<'a> {
    /// `{}`: transport keepalive.
    KeepAlive,
    /// Successful invocation result.
    Result { id: u64, result: &'a Value },
    /// Failed invocation.
    Error { id: u64, error: String },
    /// Server-pushed hub messages (may be empty).
    Messages(&'a [Value]),
}

pub fn classify(v: &Value) -> Result<HubFrame<'_>, DecodeError> {
    let obj = v.as_object().ok_or_else(|| DecodeError::Unrecognized(preview(&v.to_string())))?;
    if obj.is_empty() {
        return Ok(HubFrame::KeepAlive);
    }
    if let Some(id) = obj.get("I").and_then(|i| parse_i64(Some(i))) {
        let id = id.max(0) as u64;
        if let Some(err) = obj.get("E") {
            let error = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
            return Ok(HubFrame::Error { id, error });
        }
        if let Some(result) = obj.get("R") {
            return Ok(HubFrame::Result { id, result });
        }
    }
    if let Some(messages) = obj.get("M").and_then(Value::as_array) {
        return Ok(HubFrame::Messages(messages));
    }
    // Init and group-token frames (`{"C":..,"S":1}`, `{"C":..,"G":..}`) carry no data.
    if obj.contains_key("C") {
        return Ok(HubFrame::Messages(&[]));
    }
    Err(DecodeError::Unrecognized(preview(&v.to_string())))
}
