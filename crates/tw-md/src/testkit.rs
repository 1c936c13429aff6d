//! In-memory doubles for the pipeline: a scripted transport, a scripted
//! adapter speaking a tiny JSON dialect, and a recording sink.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tw_core::error::{DecodeError, TransportError, TwError, TwResult};
use tw_core::time_util::TimeUnit;
use tw_core::ws::Transport;
use tw_core::{AckKey, ChannelAck, Compression, Exchange, Market, Message, NormalizedTradeRecord, RawFrame, TradeTick};

use crate::adapter::{ExchangeProfile, FeedAdapter};
use crate::codec::{ChannelNaming, FrameCodec};
use crate::json_util::{decimal_string, parse_i64};
use crate::sink::TradeSink;

/// What the scripted transport does on its next `receive`.
pub(crate) enum Step {
    Frame(RawFrame),
    Fail(TransportError),
    /// Stream ends (`None`).
    End,
    /// Never returns.
    Hang,
}

pub(crate) fn frame(v: Value) -> Step {
    Step::Frame(RawFrame::text(v.to_string()))
}

/// Observer for a [`ScriptedTransport`] after it has been moved into the engine.
#[derive(Clone, Default)]
pub(crate) struct TransportProbe {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl TransportProbe {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_json(&self) -> Vec<Value> {
        self.sent().iter().map(|s| serde_json::from_str(s).unwrap()).collect()
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedTransport {
    steps: VecDeque<Step>,
    probe: TransportProbe,
    fail_sends: bool,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> (Self, TransportProbe) {
        let probe = TransportProbe::default();
        (Self { steps: steps.into(), probe: probe.clone(), fail_sends: false }, probe)
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Io("broken pipe".into()));
        }
        self.probe.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn receive(&mut self) -> Option<Result<RawFrame, TransportError>> {
        match self.steps.pop_front() {
            Some(Step::Frame(f)) => Some(Ok(f)),
            Some(Step::Fail(e)) => Some(Err(e)),
            Some(Step::End) | None => None,
            Some(Step::Hang) => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

pub(crate) const TEST_NAMING: ChannelNaming = ChannelNaming {
    prefix: "trade.",
    suffix: "",
    delimiter: '.',
    symbol_segment: 1,
    lowercase: false,
    control_channel: None,
};

pub(crate) fn test_profile() -> ExchangeProfile {
    ExchangeProfile {
        exchange: Exchange::Huobi,
        naming: TEST_NAMING,
        compression: Compression::None,
        time_unit: TimeUnit::Milliseconds,
        subscribe_batch: 1,
        subscribe_pacing: None,
    }
}

/// Adapter whose connections, auth results and catalogs are queued up front.
///
/// Dialect: `{"ping":n}`, `{"hb":true}`, `{"ack":ch,"ok":bool,"code":..}`,
/// `{"ch":"trade.SYM","trades":[{"p","q","t"}]}`, `{"expiring":true}`.
pub(crate) struct ScriptedAdapter {
    profile: ExchangeProfile,
    codec: FrameCodec,
    markets: Vec<Market>,
    catalogs: Mutex<VecDeque<TwResult<Vec<Market>>>>,
    connections: Mutex<VecDeque<TwResult<ScriptedTransport>>>,
    auth: Option<Mutex<VecDeque<TwResult<Vec<RawFrame>>>>>,
    /// Once the queued auth results run out, `authenticate` never returns.
    stall_drained_auth: bool,
    pub connects: AtomicUsize,
    pub auth_calls: AtomicUsize,
    pub catalog_calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(symbols: &[&str]) -> Self {
        Self::with_profile(test_profile(), symbols)
    }

    pub fn with_profile(profile: ExchangeProfile, symbols: &[&str]) -> Self {
        Self {
            codec: FrameCodec::new(profile.compression, 16 << 20),
            profile,
            markets: symbols.iter().map(|s| Market::new(*s)).collect(),
            catalogs: Mutex::default(),
            connections: Mutex::default(),
            auth: None,
            stall_drained_auth: false,
            connects: AtomicUsize::new(0),
            auth_calls: AtomicUsize::new(0),
            catalog_calls: AtomicUsize::new(0),
        }
    }

    pub fn markets(&self) -> Vec<Market> {
        self.markets.clone()
    }

    pub fn push_catalog(&self, result: TwResult<Vec<Market>>) {
        self.catalogs.lock().unwrap().push_back(result);
    }

    pub fn push_connection(&self, result: TwResult<ScriptedTransport>) {
        self.connections.lock().unwrap().push_back(result);
    }

    /// Require auth; each `authenticate` call pops the next result (default Ok).
    pub fn with_auth(mut self, results: Vec<TwResult<Vec<RawFrame>>>) -> Self {
        self.auth = Some(Mutex::new(results.into()));
        self
    }

    /// Make `authenticate` hang after the queued results are used up.
    pub fn stalling_auth(mut self) -> Self {
        self.stall_drained_auth = true;
        self
    }
}

#[async_trait]
impl FeedAdapter for ScriptedAdapter {
    fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    async fn fetch_markets(&self) -> TwResult<Vec<Market>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.catalogs.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.markets.clone()))
    }

    async fn connect(&self) -> TwResult<Box<dyn Transport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.connections.lock().unwrap().pop_front();
        match next {
            Some(Ok(t)) => Ok(Box::new(t)),
            Some(Err(e)) => Err(e),
            None => Ok(Box::new(ScriptedTransport::new(vec![Step::Hang]).0)),
        }
    }

    fn requires_auth(&self) -> bool {
        self.auth.is_some()
    }

    async fn authenticate(&self, transport: &mut dyn Transport) -> TwResult<Vec<RawFrame>> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        transport.send_text(json!({"auth": true}).to_string()).await?;
        let next = self.auth.as_ref().and_then(|q| q.lock().unwrap().pop_front());
        match next {
            Some(result) => result,
            None if self.stall_drained_auth => std::future::pending().await,
            None => Ok(Vec::new()),
        }
    }

    fn encode_subscribe(&self, request_id: u64, channels: &[&str]) -> String {
        json!({"sub": channels, "id": request_id}).to_string()
    }

    fn decode(&self, frame: &RawFrame) -> Result<Message, DecodeError> {
        let v = self.codec.json(frame)?;
        if let Some(n) = v.get("ping").and_then(Value::as_i64) {
            return Ok(Message::Keepalive { nonce: Some(n) });
        }
        if v.get("hb").is_some() {
            return Ok(Message::Keepalive { nonce: None });
        }
        if v.get("expiring").is_some() {
            return Ok(Message::AuthExpiring);
        }
        if let Some(ch) = v.get("ack").and_then(Value::as_str) {
            let key = AckKey::Channel(ch.to_string());
            return Ok(if v["ok"].as_bool() == Some(true) {
                Message::SubscriptionAck(vec![ChannelAck::ok(key)])
            } else {
                let code = v.get("code").and_then(Value::as_str).unwrap_or("error");
                Message::SubscriptionAck(vec![ChannelAck::failed(key, code)])
            });
        }
        if let (Some(ch), Some(trades)) = (v.get("ch").and_then(Value::as_str), v["trades"].as_array()) {
            let symbol = self.profile.naming.symbol_of(ch).unwrap_or_default().to_string();
            let ticks = trades
                .iter()
                .map(|t| TradeTick {
                    symbol: symbol.clone(),
                    price: decimal_string(t.get("p")).unwrap_or_default(),
                    quantity: decimal_string(t.get("q")).unwrap_or_default(),
                    trade_time: parse_i64(t.get("t")).unwrap_or_default(),
                    trade_id: None,
                })
                .collect();
            return Ok(Message::TradeBatch { channel: ch.to_string(), ticks });
        }
        Err(DecodeError::Unrecognized(v.to_string()))
    }
}

/// Sink that records every push attempt.
#[derive(Default)]
pub(crate) struct RecordingSink {
    records: Mutex<Vec<NormalizedTradeRecord>>,
    attempts: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_on: Vec<usize>,
    delay: Option<Duration>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the attempts with these zero-based indexes.
    pub fn failing_on(fail_on: &[usize]) -> Arc<Self> {
        Arc::new(Self { fail_on: fail_on.to_vec(), ..Self::default() })
    }

    /// Every push takes `delay` before completing.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay: Some(delay), ..Self::default() })
    }

    pub fn records(&self) -> Vec<NormalizedTradeRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` attempts have completed.
    pub async fn wait_for(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.completed.load(Ordering::SeqCst) >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl TradeSink for RecordingSink {
    async fn push(&self, record: NormalizedTradeRecord) -> TwResult<()> {
        let index = self.attempts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = if self.fail_on.contains(&index) {
            Err(TwError::Push(format!("scripted failure on attempt {index}")))
        } else {
            self.records.lock().unwrap().push(record);
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
        result
    }
}
