//! Trade forwarding: tick → normalized record → downstream push.
//!
//! Delivery is at-most-once. Each tick gets exactly one push attempt with a
//! per-call timeout; a failure is logged and the record dropped. Pushes run as
//! spawned tasks bounded by a semaphore, so a slow downstream slows the read
//! loop instead of growing a queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{trace, warn};
use tw_core::config::ConnectorConfig;
use tw_core::error::{TwError, TwResult};
use tw_core::time_util::TimeUnit;
use tw_core::{Exchange, NormalizedTradeRecord, TradeTick};

use crate::sink::TradeSink;

#[derive(Debug, Clone, Copy)]
pub struct ForwarderSettings {
    pub push_timeout: Duration,
    pub max_in_flight: usize,
}

impl ForwarderSettings {
    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self { push_timeout: config.push_timeout(), max_in_flight: config.effective_max_in_flight() }
    }
}

#[derive(Clone)]
pub struct Forwarder {
    exchange: Exchange,
    time_unit: TimeUnit,
    sink: Arc<dyn TradeSink>,
    permits: Arc<Semaphore>,
    settings: ForwarderSettings,
}

impl Forwarder {
    pub fn new(exchange: Exchange, time_unit: TimeUnit, sink: Arc<dyn TradeSink>, settings: ForwarderSettings) -> Self {
        let settings = ForwarderSettings { max_in_flight: settings.max_in_flight.max(1), ..settings };
        Self { exchange, time_unit, sink, permits: Arc::new(Semaphore::new(settings.max_in_flight)), settings }
    }

    pub fn normalize(&self, tick: &TradeTick) -> NormalizedTradeRecord {
        NormalizedTradeRecord::from_tick(self.exchange, self.time_unit, tick)
    }

    /// Push one tick and wait for the outcome.
    pub async fn forward(&self, tick: &TradeTick) -> TwResult<()> {
        push_once(self.sink.as_ref(), self.normalize(tick), self.settings.push_timeout).await
    }

    /// Start one push per tick. Returns once every push has been started;
    /// waits for a free slot whenever `max_in_flight` pushes are running.
    pub async fn forward_batch(&self, ticks: Vec<TradeTick>) {
        for tick in ticks {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                warn!("[{}] forwarder closed, dropping {}", self.exchange, tick.symbol);
                return;
            };
            let record = self.normalize(&tick);
            let sink = self.sink.clone();
            let timeout = self.settings.push_timeout;
            let exchange = self.exchange;

            tokio::spawn(async move {
                let symbol = record.symbol.clone();
                let trade_time = record.trade_time;
                match push_once(sink.as_ref(), record, timeout).await {
                    Ok(()) => trace!("[{exchange}] pushed {symbol} @ {trade_time}"),
                    Err(e) => warn!("[{exchange}] dropped trade {symbol} @ {trade_time}: {e}"),
                }
                drop(permit);
            });
        }
    }

    /// Wait until every started push has finished or timed out.
    pub async fn flush(&self) {
        let all = u32::try_from(self.settings.max_in_flight).unwrap_or(u32::MAX);
        if let Ok(permits) = self.permits.acquire_many(all).await {
            drop(permits);
        }
    }
}

async fn push_once(sink: &dyn TradeSink, record: NormalizedTradeRecord, timeout: Duration) -> TwResult<()> {
    match tokio::time::timeout(timeout, sink.push(record)).await {
        Ok(result) => result,
        Err(_) => Err(TwError::Push(format!("timed out after {timeout:?}"))),
    }
}
