//! Module registry: factory for creating feed modules from config.

use std::sync::Arc;

use anyhow::Result;
use tw_core::Exchange;
use tw_core::config::ConnectorConfig;

use crate::FeedModule;
use crate::binance::BinanceAdapter;
use crate::bittrex::BittrexAdapter;
use crate::huobi::HuobiAdapter;
use crate::kraken::KrakenAdapter;
use crate::pipeline::Connector;
use crate::sink::TradeSink;

/// Create a `FeedModule` based on the `exchange` field in the config.
///
/// Every exchange is the same generic [`Connector`] engine parameterized by
/// its adapter.
pub fn create_feed_module(config: &ConnectorConfig, sink: Arc<dyn TradeSink>) -> Result<Box<dyn FeedModule>> {
    let exchange: Exchange = config.exchange.parse()?;
    let module: Box<dyn FeedModule> = match exchange {
        Exchange::Huobi => Box::new(Connector::new(HuobiAdapter::new(config), config.clone(), sink)),
        Exchange::Bittrex => Box::new(Connector::new(BittrexAdapter::new(config), config.clone(), sink)),
        Exchange::Binance => Box::new(Connector::new(BinanceAdapter::new(config), config.clone(), sink)),
        Exchange::Kraken => Box::new(Connector::new(KrakenAdapter::new(config), config.clone(), sink)),
    };
    Ok(module)
}
