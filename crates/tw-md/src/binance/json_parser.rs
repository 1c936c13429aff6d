//! Binance JSON message parser.
//!
//! Parses combined-stream WebSocket messages from `stream.binance.com` into
//! [`Message`] variants. Prices and quantities arrive as strings and are kept
//! verbatim.

use serde_json::{Value, json};
use tw_core::error::DecodeError;
use tw_core::{AckKey, ChannelAck, Market, Message, TradeTick};

use crate::catalog::{optional_string, required_str};
use crate::codec::ChannelNaming;
use crate::json_util::{decimal_string, id_string, parse_i64, preview};

/// Parse a Binance WebSocket message.
///
/// Market data may be wrapped as `{"stream": "<name>", "data": {...}}`;
/// control answers are `{"result": null, "id": n}` or
/// `{"error": {"code", "msg"}, "id": n}`.
pub fn parse_message(v: &Value, naming: &ChannelNaming) -> Result<Message, DecodeError> {
    if let Some(id) = v.get("id").and_then(|i| parse_i64(Some(i))) {
        return parse_control(v, id.max(0) as u64);
    }

    let (stream, data) = match v.get("data") {
        Some(data) => (v.get("stream").and_then(Value::as_str), data),
        None => (None, v),
    };

    match data.get("e").and_then(Value::as_str) {
        Some("aggTrade") => parse_agg_trade(data, stream, naming),
        _ => Err(unrecognized(v)),
    }
}

/// Build one `SUBSCRIBE` request.
pub fn build_subscribe(request_id: u64, channels: &[&str]) -> String {
    json!({
        "method": "SUBSCRIBE",
        "params": channels,
        "id": request_id
    })
    .to_string()
}

/// Map `GET /api/v3/exchangeInfo`.
pub fn parse_markets(body: &Value) -> Result<Vec<Market>, String> {
    if let Some(msg) = body.get("msg").and_then(Value::as_str) {
        return Err(msg.to_string());
    }
    let symbols = body.get("symbols").and_then(Value::as_array).ok_or("missing `symbols` array")?;
    symbols
        .iter()
        .map(|e| {
            Ok(Market {
                symbol: required_str(e, "symbol")?.to_string(),
                base_currency: optional_string(e, "baseAsset"),
                quote_currency: optional_string(e, "quoteAsset"),
                status: optional_string(e, "status"),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Individual parsers
// ---------------------------------------------------------------------------

fn parse_control(v: &Value, id: u64) -> Result<Message, DecodeError> {
    let key = AckKey::Request(id);
    if let Some(err) = v.get("error") {
        let code = parse_i64(err.get("code")).map(|c| c.to_string()).unwrap_or_else(|| "error".into());
        let ack = match err.get("msg").and_then(Value::as_str) {
            Some(msg) => ChannelAck::failed(key, format!("{code}: {msg}")),
            None => ChannelAck::failed(key, code),
        };
        return Ok(Message::SubscriptionAck(vec![ack]));
    }
    if v.get("result").is_some() {
        return Ok(Message::SubscriptionAck(vec![ChannelAck::ok(key)]));
    }
    Err(unrecognized(v))
}

fn parse_agg_trade(v: &Value, stream: Option<&str>, naming: &ChannelNaming) -> Result<Message, DecodeError> {
    let tick = (|| {
        Some(TradeTick {
            symbol: v.get("s")?.as_str()?.to_string(),
            price: decimal_string(v.get("p"))?,
            quantity: decimal_string(v.get("q"))?,
            trade_time: parse_i64(v.get("T"))?,
            trade_id: id_string(v.get("a")),
        })
    })()
    .ok_or_else(|| unrecognized(v))?;

    let channel = stream.map(str::to_string).unwrap_or_else(|| naming.trade_channel(&tick.symbol));
    Ok(Message::TradeBatch { channel, ticks: vec![tick] })
}

fn unrecognized(v: &Value) -> DecodeError {
    DecodeError::Unrecognized(preview(&v.to_string()))
}
