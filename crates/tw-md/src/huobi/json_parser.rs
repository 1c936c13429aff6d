//! Huobi JSON message parser.
//!
//! Frames arrive gzip-compressed; [`crate::codec::FrameCodec`] inflates them
//! before they reach this module. Message shapes:
//!
//! - `{"ping": 1492420473027}`
//! - `{"id": "<channel>", "status": "ok", "subbed": "<channel>", "ts": ...}`
//! - `{"id": "<channel>", "status": "error", "err-code": "...", "err-msg": "..."}`
//! - `{"ch": "market.btcusdt.trade.detail", "tick": {"data": [{"price", "amount", "ts", "tradeId"}]}}`

use serde_json::Value;
use tw_core::error::DecodeError;
use tw_core::{AckKey, ChannelAck, Market, Message, TradeTick};

use crate::catalog::{optional_string, required_str};
use crate::codec::ChannelNaming;
use crate::json_util::{decimal_string, id_string, parse_i64, preview};

pub fn parse_message(v: &Value, naming: &ChannelNaming) -> Result<Message, DecodeError> {
    if let Some(ping) = v.get("ping") {
        let nonce = parse_i64(Some(ping)).ok_or_else(|| unrecognized(v))?;
        return Ok(Message::Keepalive { nonce: Some(nonce) });
    }
    if let Some(status) = v.get("status").and_then(Value::as_str) {
        return parse_ack(v, status);
    }
    if let Some(ch) = v.get("ch").and_then(Value::as_str) {
        return parse_trades(v, ch, naming);
    }
    Err(unrecognized(v))
}

/// Build the subscribe request for one channel. The channel doubles as the
/// request id so the ack names the channel it answers.
pub fn build_subscribe(channel: &str) -> String {
    serde_json::json!({ "sub": channel, "id": channel }).to_string()
}

/// Map `GET /v1/common/symbols`.
pub fn parse_markets(body: &Value) -> Result<Vec<Market>, String> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
    if status != "ok" {
        let msg = body.get("err-msg").and_then(Value::as_str).unwrap_or("no error message");
        return Err(format!("status {status:?}: {msg}"));
    }
    let data = body.get("data").and_then(Value::as_array).ok_or("missing `data` array")?;
    data.iter()
        .map(|e| {
            Ok(Market {
                symbol: required_str(e, "symbol")?.to_string(),
                base_currency: optional_string(e, "base-currency"),
                quote_currency: optional_string(e, "quote-currency"),
                status: optional_string(e, "state"),
            })
        })
        .collect()
}

fn parse_ack(v: &Value, status: &str) -> Result<Message, DecodeError> {
    let channel = id_string(v.get("id"))
        .or_else(|| id_string(v.get("subbed")))
        .ok_or_else(|| unrecognized(v))?;
    let key = AckKey::Channel(channel);

    let ack = if status == "ok" {
        ChannelAck::ok(key)
    } else {
        let code = v.get("err-code").and_then(Value::as_str).unwrap_or(status);
        match v.get("err-msg").and_then(Value::as_str) {
            Some(msg) => ChannelAck::failed(key, format!("{code}: {msg}")),
            None => ChannelAck::failed(key, code),
        }
    };
    Ok(Message::SubscriptionAck(vec![ack]))
}

fn parse_trades(v: &Value, ch: &str, naming: &ChannelNaming) -> Result<Message, DecodeError> {
    let symbol = naming.symbol_of(ch).ok_or_else(|| unrecognized(v))?;
    let data = v.pointer("/tick/data").and_then(Value::as_array).ok_or_else(|| unrecognized(v))?;

    let ticks = data
        .iter()
        .map(|t| {
            Some(TradeTick {
                symbol: symbol.to_string(),
                price: decimal_string(t.get("price"))?,
                quantity: decimal_string(t.get("amount"))?,
                trade_time: parse_i64(t.get("ts"))?,
                trade_id: id_string(t.get("tradeId")).or_else(|| id_string(t.get("id"))),
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| unrecognized(v))?;

    Ok(Message::TradeBatch { channel: ch.to_string(), ticks })
}

fn unrecognized(v: &Value) -> DecodeError {
    DecodeError::Unrecognized(preview(&v.to_string()))
}
