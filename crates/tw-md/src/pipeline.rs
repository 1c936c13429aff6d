//! Generic per-exchange connector.
//!
//! Provides [`Connector`], the [`FeedModule`] every exchange runs as. An
//! exchange only supplies a [`FeedAdapter`]; the connector wires the market
//! catalog, the connection state machine and the forwarder around it.
//!
//! # Architecture
//!
//! ```text
//! Connector.start() ──► catalog fetch (fixed-delay retry)
//!                   ──► ConnectionManager.run()   ──► Forwarder ──► TradeSink
//! Connector.stop()  ──► shutdown signal ──► socket closed ──► in-flight pushes flushed
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tw_core::Market;
use tw_core::config::ConnectorConfig;

use crate::FeedModule;
use crate::adapter::FeedAdapter;
use crate::connection::{ConnectionManager, ConnectionSettings, ConnectionState, wait_shutdown};
use crate::forwarder::{Forwarder, ForwarderSettings};
use crate::sink::TradeSink;

/// One exchange feed: catalog → stream → downstream.
pub struct Connector<A: FeedAdapter> {
    name: String,
    adapter: Arc<A>,
    config: ConnectorConfig,
    sink: Arc<dyn TradeSink>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<Option<ConnectionState>>>,
}

impl<A: FeedAdapter> Connector<A> {
    pub fn new(adapter: A, config: ConnectorConfig, sink: Arc<dyn TradeSink>) -> Self {
        Self {
            name: adapter.profile().label().to_string(),
            adapter: Arc::new(adapter),
            config,
            sink,
            shutdown: watch::channel(false).0,
            task: None,
        }
    }
}

#[async_trait]
impl<A: FeedAdapter> FeedModule for Connector<A> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            bail!("[{}] already started", self.name);
        }
        self.shutdown.send_replace(false);
        let task =
            run_connector(self.adapter.clone(), self.config.clone(), self.sink.clone(), self.shutdown.subscribe());
        self.task = Some(tokio::spawn(task));
        info!("[{}] started", self.name);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            match task.await? {
                Some(state) => info!(
                    "[{}] stopped after {} generation(s), {} reconnect(s)",
                    self.name, state.generation, state.retries
                ),
                None => info!("[{}] stopped before the market catalog was loaded", self.name),
            }
        }
        Ok(())
    }
}

/// Run one connector until shutdown. Returns `None` when shutdown arrived
/// before the catalog could be fetched.
pub async fn run_connector<A: FeedAdapter>(
    adapter: Arc<A>,
    config: ConnectorConfig,
    sink: Arc<dyn TradeSink>,
    mut shutdown: watch::Receiver<bool>,
) -> Option<ConnectionState> {
    let profile = adapter.profile().clone();
    let settings = ConnectionSettings::from_config(&config);

    let markets = fetch_catalog(adapter.as_ref(), settings.reconnect_delay, &mut shutdown).await?;
    if markets.is_empty() {
        warn!("[{}] market catalog is empty; subscribing to control channels only", profile.label());
    }

    let forwarder = Forwarder::new(profile.exchange, profile.time_unit, sink, ForwarderSettings::from_config(&config));
    let manager = ConnectionManager::new(adapter, Arc::new(markets), forwarder.clone(), settings, shutdown);
    let state = manager.run().await;

    forwarder.flush().await;
    Some(state)
}

/// Fetch the catalog, retrying with a fixed delay until it succeeds or
/// shutdown is signalled.
async fn fetch_catalog<A: FeedAdapter>(
    adapter: &A,
    delay: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<Vec<Market>> {
    let label = adapter.profile().label();
    loop {
        let fetched = tokio::select! {
            r = adapter.fetch_markets() => r,
            _ = wait_shutdown(shutdown) => return None,
        };
        match fetched {
            Ok(markets) => return Some(markets),
            Err(e) => warn!("[{label}] {e}; retrying in {delay:?}"),
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_shutdown(shutdown) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;
    use tw_core::error::TwError;

    use super::*;
    use crate::testkit::{RecordingSink, ScriptedAdapter, ScriptedTransport, Step, frame};

    fn config() -> ConnectorConfig {
        ConnectorConfig::for_exchange("huobi")
    }

    #[tokio::test(start_paused = true)]
    async fn catalog_failures_are_retried_with_a_fixed_delay() {
        let adapter = Arc::new(ScriptedAdapter::new(&["a"]));
        adapter.push_catalog(Err(TwError::CatalogFetch("HTTP 502".into())));
        adapter.push_catalog(Err(TwError::CatalogFetch("HTTP 502".into())));
        let (tx, rx) = watch::channel(false);

        let started = tokio::time::Instant::now();
        let run = tokio::spawn(run_connector(adapter.clone(), config(), RecordingSink::new(), rx));
        while adapter.connects.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let elapsed = started.elapsed();
        tx.send_replace(true);
        let state = run.await.unwrap();

        assert_eq!(adapter.catalog_calls.load(Ordering::SeqCst), 3);
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
        assert_eq!(state.unwrap().generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_catalog_retry_returns_none() {
        let adapter = Arc::new(ScriptedAdapter::new(&["a"]));
        adapter.push_catalog(Err(TwError::CatalogFetch("timeout".into())));
        let (tx, rx) = watch::channel(false);

        let run = tokio::spawn(run_connector(adapter.clone(), config(), RecordingSink::new(), rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send_replace(true);

        assert!(run.await.unwrap().is_none());
        assert_eq!(adapter.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn module_streams_trades_until_stopped() {
        let adapter = ScriptedAdapter::new(&["btcusdt"]);
        let (transport, probe) = ScriptedTransport::new(vec![
            frame(json!({"ack": "trade.btcusdt", "ok": true})),
            frame(json!({"ch": "trade.btcusdt", "trades": [
                {"p": 100.5, "q": 2, "t": 1_700_000_000_000_i64},
                {"p": "100.6", "q": "0.5", "t": 1_700_000_000_500_i64},
            ]})),
            Step::Hang,
        ]);
        adapter.push_connection(Ok(transport));
        let sink = RecordingSink::new();
        let mut module = Connector::new(adapter, config(), sink.clone());

        assert_eq!(module.name(), "huobi");
        module.start().await.unwrap();
        assert!(module.start().await.is_err());
        tokio::time::timeout(Duration::from_secs(30), sink.wait_for(2)).await.unwrap();
        module.stop().await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].price.as_str(), records[0].quantity.as_str()), ("100.5", "2"));
        assert_eq!(records[0].trade_time, 1_700_000_000);
        assert!(probe.closed());
    }
}
