//! # tw-md
//!
//! Trade feed connectors for multiple cryptocurrency exchanges.
//!
//! ## Architecture
//!
//! Each exchange provides a [`adapter::FeedAdapter`] describing its wire
//! protocol (catalog URL and schema, stream endpoint, subscribe encoding,
//! frame decoding). The generic [`pipeline::Connector`] engine handles market
//! discovery, the connection state machine, subscriptions, keepalives and
//! forwarding automatically.
//!
//! ## Shared infrastructure
//!
//! - [`pipeline`]: `Connector`, the per-exchange engine
//! - [`connection`]: connection lifecycle state machine
//! - [`subscription`]: channel derivation and subscribe handshake
//! - [`forwarder`] / [`sink`]: normalization and downstream gRPC push
//! - [`catalog`]: REST market discovery
//! - [`codec`] / [`json_util`]: frame decompression and JSON helpers

pub mod adapter;
pub mod binance;
pub mod bittrex;
pub mod catalog;
pub mod codec;
pub mod connection;
pub mod forwarder;
pub mod huobi;
pub mod json_util;
pub mod kraken;
pub mod pipeline;
pub mod registry;
pub mod sink;
pub mod subscription;

#[cfg(test)]
mod testkit;

use anyhow::Result;
use async_trait::async_trait;

/// Trait implemented by every exchange feed.
///
/// Only `Send` is required (not `Sync`) because modules are driven
/// sequentially by the runner, never concurrently.
#[async_trait]
pub trait FeedModule: Send {
    /// Human-readable module name.
    fn name(&self) -> &str;
    /// Fetch markets, connect and begin forwarding trades.
    async fn start(&mut self) -> Result<()>;
    /// Signal shutdown and wait for the connection to close.
    async fn stop(&mut self) -> Result<()>;
}
