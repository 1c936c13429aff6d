//! Trade data flowing from the codec to the forwarder.
//!
//! # Value convention
//!
//! Prices and quantities are kept as **decimal strings in the exchange's own
//! lexical form**; they are never parsed into floating point. Trade times stay
//! in the exchange's native unit until [`NormalizedTradeRecord::from_tick`]
//! converts them to whole epoch seconds.

use crate::time_util::TimeUnit;
use crate::types::Exchange;

/// A single decoded fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeTick {
    pub symbol: String,
    /// Decimal string, exchange-native precision.
    pub price: String,
    /// Decimal string, exchange-native precision.
    pub quantity: String,
    /// Trade time in the exchange's native unit.
    pub trade_time: i64,
    /// Exchange trade id or sequence, when present.
    pub trade_id: Option<String>,
}

/// The exchange-agnostic record sent downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTradeRecord {
    pub exchange: Exchange,
    pub symbol: String,
    pub price: String,
    pub quantity: String,
    /// Whole seconds since the Unix epoch.
    pub trade_time: i64,
}

impl NormalizedTradeRecord {
    /// Build the downstream record for one tick, normalizing its time with the
    /// exchange's native unit.
    pub fn from_tick(exchange: Exchange, unit: TimeUnit, tick: &TradeTick) -> Self {
        Self {
            exchange,
            symbol: tick.symbol.clone(),
            price: tick.price.clone(),
            quantity: tick.quantity.clone(),
            trade_time: unit.to_epoch_secs(tick.trade_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huobi_tick_normalizes_to_seconds() {
        let tick = TradeTick {
            symbol: "btcusdt".into(),
            price: "100.5".into(),
            quantity: "2".into(),
            trade_time: 1_700_000_000_000,
            trade_id: None,
        };
        let rec = NormalizedTradeRecord::from_tick(Exchange::Huobi, TimeUnit::Milliseconds, &tick);
        assert_eq!(rec.exchange.as_str(), "huobi");
        assert_eq!(rec.symbol, "btcusdt");
        assert_eq!(rec.price, "100.5");
        assert_eq!(rec.quantity, "2");
        assert_eq!(rec.trade_time, 1_700_000_000);
    }
}
