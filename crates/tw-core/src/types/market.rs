//! Tradable markets as reported by an exchange's REST catalog.

/// A tradable instrument known to the exchange.
///
/// Only `symbol` is required by the pipeline; the rest is informational and
/// filled when the exchange's catalog schema provides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    /// Exchange-native symbol (e.g. `btcusdt`, `BTC-USD`, `BTCUSDT`).
    pub symbol: String,
    pub base_currency: Option<String>,
    pub quote_currency: Option<String>,
    /// Exchange-native status string (e.g. `online`, `TRADING`).
    pub status: Option<String>,
}

impl Market {
    /// A market known only by its symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), base_currency: None, quote_currency: None, status: None }
    }
}
