//! Bittrex hub message parser.
//!
//! Trade pushes carry one argument: a base64 string holding a raw-deflate
//! compressed JSON `TradeEvent`:
//!
//! ```json
//! {"sequence": 42, "marketSymbol": "BTC-USD",
//!  "deltas": [{"id": "..", "executedAt": "2021-05-07T12:34:56.78Z", "quantity": "0.1", "rate": "43000", "takerSide": "BUY"}]}
//! ```
//!
//! `Subscribe` results are positional: entry `i` answers channel `i` of the
//! invocation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::DateTime;
use serde_json::Value;
use tw_core::error::DecodeError;
use tw_core::{AckKey, ChannelAck, Market, Message, TradeTick};

use super::hub::{self, HubFrame};
use crate::catalog::{optional_string, required_str};
use crate::codec::{ChannelNaming, FrameCodec};
use crate::json_util::{decimal_string, id_string, preview};

/// Parse one hub frame; `codec` inflates trade payloads.
pub fn parse_message(v: &Value, naming: &ChannelNaming, codec: &FrameCodec) -> Result<Message, DecodeError> {
    match hub::classify(v)? {
        HubFrame::KeepAlive => Ok(Message::Keepalive { nonce: None }),
        HubFrame::Result { id, result } => parse_subscribe_result(id, result),
        HubFrame::Error { id, error } => {
            Ok(Message::SubscriptionAck(vec![ChannelAck::failed(AckKey::Request(id), error)]))
        }
        HubFrame::Messages(entries) => parse_hub_messages(entries, naming, codec),
    }
}

/// Map `GET /v3/markets`.
pub fn parse_markets(body: &Value) -> Result<Vec<Market>, String> {
    let list = body.as_array().ok_or("expected a market array")?;
    list.iter()
        .map(|e| {
            Ok(Market {
                symbol: required_str(e, "symbol")?.to_string(),
                base_currency: optional_string(e, "baseCurrencySymbol"),
                quote_currency: optional_string(e, "quoteCurrencySymbol"),
                status: optional_string(e, "status"),
            })
        })
        .collect()
}

/// Decode one compressed hub argument into JSON.
pub fn decode_payload(arg: &Value, codec: &FrameCodec) -> Result<Value, DecodeError> {
    let encoded = arg.as_str().ok_or_else(|| DecodeError::Unrecognized(preview(&arg.to_string())))?;
    let compressed = STANDARD.decode(encoded).map_err(|e| DecodeError::Decompress(format!("base64: {e}")))?;
    let raw = codec.inflate(&compressed)?;
    Ok(serde_json::from_slice(&raw)?)
}

fn parse_subscribe_result(id: u64, result: &Value) -> Result<Message, DecodeError> {
    let entries: Vec<&Value> = match result {
        Value::Array(list) => list.iter().collect(),
        Value::Object(_) => vec![result],
        other => return Err(DecodeError::Unrecognized(preview(&other.to_string()))),
    };
    let acks = entries
        .into_iter()
        .enumerate()
        .map(|(index, r)| {
            let key = AckKey::Slot { request: id, index };
            if r.get("Success").and_then(Value::as_bool) == Some(true) {
                ChannelAck::ok(key)
            } else {
                ChannelAck::failed(key, r.get("ErrorCode").and_then(Value::as_str).unwrap_or("UNKNOWN"))
            }
        })
        .collect();
    Ok(Message::SubscriptionAck(acks))
}

fn parse_hub_messages(entries: &[Value], naming: &ChannelNaming, codec: &FrameCodec) -> Result<Message, DecodeError> {
    let mut channel = None;
    let mut ticks = Vec::new();
    let mut expiring = false;

    for entry in entries {
        match entry.get("M").and_then(Value::as_str).unwrap_or_default() {
            "trade" => {
                for arg in entry.get("A").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default() {
                    let event = decode_payload(arg, codec)?;
                    let (ch, batch) = parse_trade_event(&event, naming)?;
                    channel.get_or_insert(ch);
                    ticks.extend(batch);
                }
            }
            "authenticationExpiring" => expiring = true,
            // heartbeat and methods this connector does not subscribe to
            _ => {}
        }
    }

    match channel {
        Some(channel) if !ticks.is_empty() => Ok(Message::TradeBatch { channel, ticks }),
        _ if expiring => Ok(Message::AuthExpiring),
        _ => Ok(Message::Keepalive { nonce: None }),
    }
}

fn parse_trade_event(event: &Value, naming: &ChannelNaming) -> Result<(String, Vec<TradeTick>), DecodeError> {
    let unrecognized = || DecodeError::Unrecognized(preview(&event.to_string()));
    let symbol = event.get("marketSymbol").and_then(Value::as_str).ok_or_else(unrecognized)?;
    let deltas = event.get("deltas").and_then(Value::as_array).ok_or_else(unrecognized)?;

    let ticks = deltas
        .iter()
        .map(|d| {
            let executed_at = d.get("executedAt").and_then(Value::as_str)?;
            Some(TradeTick {
                symbol: symbol.to_string(),
                price: decimal_string(d.get("rate"))?,
                quantity: decimal_string(d.get("quantity"))?,
                trade_time: DateTime::parse_from_rfc3339(executed_at).ok()?.timestamp_millis(),
                trade_id: id_string(d.get("id")),
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(unrecognized)?;

    Ok((naming.trade_channel(symbol), ticks))
}
