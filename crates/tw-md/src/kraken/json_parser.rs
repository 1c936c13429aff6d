//! Kraken JSON message parser.
//!
//! Control traffic is JSON objects keyed by `event`; market data is a JSON
//! array:
//!
//! - `{"event": "heartbeat"}`, `{"event": "systemStatus", "status": "online", ...}`
//! - `{"event": "subscriptionStatus", "pair": "XBT/USD", "status": "subscribed" | "error", "errorMessage": ..}`
//! - `[channelID, [["5541.2", "0.158", "1534614057.321597", "s", "l", ""], ...], "trade", "XBT/USD"]`
//!
//! Trade times are fractional seconds as strings.

use serde_json::{Value, json};
use tw_core::error::DecodeError;
use tw_core::{AckKey, ChannelAck, Market, Message, TradeTick};

use crate::catalog::optional_string;
use crate::codec::ChannelNaming;
use crate::json_util::{decimal_string, preview};

pub fn parse_message(v: &Value, naming: &ChannelNaming) -> Result<Message, DecodeError> {
    match v {
        Value::Array(items) => parse_channel_message(v, items, naming),
        Value::Object(_) => parse_event(v, naming),
        _ => Err(unrecognized(v)),
    }
}

/// Build one trade subscribe request for `pairs` (websocket names, e.g. `XBT/USD`).
pub fn build_subscribe(request_id: u64, pairs: &[&str]) -> String {
    json!({
        "event": "subscribe",
        "reqid": request_id,
        "pair": pairs,
        "subscription": {"name": "trade"}
    })
    .to_string()
}

/// Map `GET /0/public/AssetPairs`. Only pairs with a websocket name can be
/// streamed, and that name is the market symbol.
pub fn parse_markets(body: &Value) -> Result<Vec<Market>, String> {
    if let Some(errors) = body.get("error").and_then(Value::as_array).filter(|e| !e.is_empty()) {
        let joined: Vec<&str> = errors.iter().filter_map(Value::as_str).collect();
        return Err(joined.join("; "));
    }
    let pairs = body.get("result").and_then(Value::as_object).ok_or("missing `result` object")?;
    Ok(pairs
        .values()
        .filter_map(|e| {
            let wsname = e.get("wsname").and_then(Value::as_str).filter(|s| !s.is_empty())?;
            Some(Market {
                symbol: wsname.to_string(),
                base_currency: optional_string(e, "base"),
                quote_currency: optional_string(e, "quote"),
                status: optional_string(e, "status"),
            })
        })
        .collect())
}

/// Whole seconds of a `"1534614057.321597"` timestamp (floor).
pub fn whole_seconds(text: &str) -> Option<i64> {
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = whole.parse().ok()?;
    let negative = whole.starts_with('-');
    Some(if negative && frac.bytes().any(|b| b != b'0') { secs - 1 } else { secs })
}

fn parse_event(v: &Value, naming: &ChannelNaming) -> Result<Message, DecodeError> {
    match v.get("event").and_then(Value::as_str) {
        Some("heartbeat" | "systemStatus" | "pong") => Ok(Message::Keepalive { nonce: None }),
        Some("subscriptionStatus") => parse_status(v, naming),
        _ => Err(unrecognized(v)),
    }
}

fn parse_status(v: &Value, naming: &ChannelNaming) -> Result<Message, DecodeError> {
    let pair = v.get("pair").and_then(Value::as_str).ok_or_else(|| unrecognized(v))?;
    let key = AckKey::Channel(naming.trade_channel(pair));
    let ack = match v.get("status").and_then(Value::as_str) {
        Some("subscribed") => ChannelAck::ok(key),
        Some("error") => {
            ChannelAck::failed(key, v.get("errorMessage").and_then(Value::as_str).unwrap_or("subscription error"))
        }
        _ => return Err(unrecognized(v)),
    };
    Ok(Message::SubscriptionAck(vec![ack]))
}

fn parse_channel_message(v: &Value, items: &[Value], naming: &ChannelNaming) -> Result<Message, DecodeError> {
    let [_, data, name, pair] = items else { return Err(unrecognized(v)) };
    let (Some("trade"), Some(pair), Some(trades)) = (name.as_str(), pair.as_str(), data.as_array()) else {
        return Err(unrecognized(v));
    };

    let ticks = trades
        .iter()
        .map(|t| {
            Some(TradeTick {
                symbol: pair.to_string(),
                price: decimal_string(t.get(0))?,
                quantity: decimal_string(t.get(1))?,
                trade_time: whole_seconds(&decimal_string(t.get(2))?)?,
                trade_id: None,
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| unrecognized(v))?;

    Ok(Message::TradeBatch { channel: naming.trade_channel(pair), ticks })
}

fn unrecognized(v: &Value) -> DecodeError {
    DecodeError::Unrecognized(preview(&v.to_string()))
}
