//! Connection lifecycle state machine.
//!
//! One [`ConnectionManager`] owns one exchange stream. It is the only task
//! that touches the transport, so keepalive replies, subscribe requests and
//! re-authentication are written in order with the reads.
//!
//! ```text
//! Disconnected ─► Connecting ─► (Authenticating) ─► Subscribing ─► Streaming
//!                     ▲                                               │
//!                     └───────────── Reconnecting ◄───────────────────┘
//!                         (fixed delay, unbounded)        any state ─► Closing (shutdown)
//! ```
//!
//! Subscriptions belong to one generation and are rebuilt on every connect.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, trace, warn};
use tw_core::config::ConnectorConfig;
use tw_core::error::{TransportError, TwError};
use tw_core::ws::Transport;
use tw_core::{Market, Message, RawFrame, SubscriptionSet};

use crate::adapter::FeedAdapter;
use crate::forwarder::Forwarder;
use crate::json_util::preview;
use crate::subscription::SubscriptionManager;

#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub reconnect_delay: Duration,
    pub ack_timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self { reconnect_delay: config.reconnect_delay(), ack_timeout: config.ack_timeout() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTag {
    Disconnected,
    Connecting,
    Authenticating,
    Subscribing,
    Streaming,
    Reconnecting,
    Closing,
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Subscribing => "subscribing",
            Self::Streaming => "streaming",
            Self::Reconnecting => "reconnecting",
            Self::Closing => "closing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub tag: StateTag,
    /// Number of connection attempts so far.
    pub generation: u64,
    /// Number of completed reconnect delays.
    pub retries: u64,
    pub last_error: Option<String>,
}

/// How one connection generation ended.
#[derive(Debug)]
pub enum GenerationOutcome {
    Shutdown,
    Reconnect(TwError),
}

pub struct ConnectionManager<A: FeedAdapter> {
    adapter: Arc<A>,
    markets: Arc<Vec<Market>>,
    subscriptions: SubscriptionManager,
    forwarder: Forwarder,
    settings: ConnectionSettings,
    shutdown: watch::Receiver<bool>,
    state: ConnectionState,
    label: &'static str,
}

impl<A: FeedAdapter> ConnectionManager<A> {
    pub fn new(
        adapter: Arc<A>,
        markets: Arc<Vec<Market>>,
        forwarder: Forwarder,
        settings: ConnectionSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let label = adapter.profile().label();
        Self {
            subscriptions: SubscriptionManager::new(adapter.profile()),
            adapter,
            markets,
            forwarder,
            settings,
            shutdown,
            state: ConnectionState { tag: StateTag::Disconnected, generation: 0, retries: 0, last_error: None },
            label,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Connect, stream and reconnect until shutdown. Returns the final state.
    pub async fn run(mut self) -> ConnectionState {
        while !shutdown_requested(&self.shutdown) {
            match self.run_once().await {
                GenerationOutcome::Shutdown => break,
                GenerationOutcome::Reconnect(err) => {
                    warn!(
                        "[{}] generation {} ended: {err}; reconnecting in {:?}",
                        self.label, self.state.generation, self.settings.reconnect_delay
                    );
                    self.state.last_error = Some(err.to_string());
                    self.transition(StateTag::Reconnecting);

                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.reconnect_delay) => {}
                        _ = wait_shutdown(&mut self.shutdown) => break,
                    }
                    self.state.retries += 1;
                }
            }
        }
        self.transition(StateTag::Closing);
        self.state
    }

    /// Run one connection generation from connect to its end.
    pub async fn run_once(&mut self) -> GenerationOutcome {
        self.state.generation += 1;
        self.transition(StateTag::Connecting);

        let connected = tokio::select! {
            r = self.adapter.connect() => r,
            _ = wait_shutdown(&mut self.shutdown) => return GenerationOutcome::Shutdown,
        };
        let mut transport = match connected {
            Ok(t) => t,
            Err(e) => return GenerationOutcome::Reconnect(e),
        };
        info!("[{}] connected (generation {})", self.label, self.state.generation);

        let outcome = self.drive(transport.as_mut()).await;
        transport.close().await;
        outcome
    }

    async fn drive(&mut self, transport: &mut dyn Transport) -> GenerationOutcome {
        let mut backlog = VecDeque::new();
        if self.adapter.requires_auth() {
            self.transition(StateTag::Authenticating);
            let auth = tokio::select! {
                r = self.adapter.authenticate(&mut *transport) => r,
                _ = wait_shutdown(&mut self.shutdown) => return GenerationOutcome::Shutdown,
            };
            match auth {
                Ok(frames) => backlog.extend(frames),
                Err(e) => return GenerationOutcome::Reconnect(e),
            }
            info!("[{}] authenticated", self.label);
        }

        self.transition(StateTag::Subscribing);
        let mut subs = SubscriptionSet::new(self.subscriptions.build_subscriptions(&self.markets));
        let sent = tokio::select! {
            r = self.subscriptions.send(self.adapter.as_ref(), &mut *transport, &mut subs) => r,
            _ = wait_shutdown(&mut self.shutdown) => return GenerationOutcome::Shutdown,
        };
        if let Err(e) = sent {
            return GenerationOutcome::Reconnect(e);
        }
        if let Err(outcome) = self.process(transport, &mut subs, backlog).await {
            return outcome;
        }

        // Bounded wait for acks; data frames are dispatched meanwhile.
        let deadline = Instant::now() + self.settings.ack_timeout;
        while !subs.all_resolved() {
            let next = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = wait_shutdown(&mut self.shutdown) => return GenerationOutcome::Shutdown,
                next = transport.receive() => next,
            };
            if let Err(outcome) = self.on_receive(transport, &mut subs, next).await {
                return outcome;
            }
        }
        self.subscriptions.log_summary(&subs);

        self.transition(StateTag::Streaming);
        loop {
            let next = tokio::select! {
                _ = wait_shutdown(&mut self.shutdown) => return GenerationOutcome::Shutdown,
                next = transport.receive() => next,
            };
            if let Err(outcome) = self.on_receive(transport, &mut subs, next).await {
                return outcome;
            }
        }
    }

    async fn on_receive(
        &self,
        transport: &mut dyn Transport,
        subs: &mut SubscriptionSet,
        next: Option<Result<RawFrame, TransportError>>,
    ) -> Result<(), GenerationOutcome> {
        match next {
            Some(Ok(frame)) => self.process(transport, subs, VecDeque::from([frame])).await,
            Some(Err(e)) => Err(GenerationOutcome::Reconnect(e.into())),
            None => Err(GenerationOutcome::Reconnect(TransportError::Closed("end of stream".into()).into())),
        }
    }

    /// Decode and dispatch frames in order. Transport and auth failures end
    /// the generation, as does shutdown during re-authentication; a frame
    /// that fails to decode is logged and skipped.
    async fn process(
        &self,
        transport: &mut dyn Transport,
        subs: &mut SubscriptionSet,
        mut queue: VecDeque<RawFrame>,
    ) -> Result<(), GenerationOutcome> {
        while let Some(frame) = queue.pop_front() {
            let message = match self.adapter.decode(&frame) {
                Ok(m) => m,
                Err(e) => {
                    warn!("[{}] dropping frame: {e} ({})", self.label, describe(&frame));
                    continue;
                }
            };

            match message {
                Message::Keepalive { nonce: Some(nonce) } => {
                    let pong = transport.send_text(self.adapter.encode_pong(nonce)).await;
                    pong.map_err(|e| GenerationOutcome::Reconnect(e.into()))?;
                    trace!("[{}] pong {nonce}", self.label);
                }
                Message::Keepalive { nonce: None } => {}
                Message::SubscriptionAck(acks) => {
                    for ack in &acks {
                        self.subscriptions.record(subs, ack);
                    }
                }
                Message::TradeBatch { channel, ticks } => {
                    trace!("[{}] {channel}: {} trade(s)", self.label, ticks.len());
                    self.forwarder.forward_batch(ticks).await;
                }
                Message::AuthExpiring => {
                    info!("[{}] session expiring, re-authenticating", self.label);
                    let mut shutdown = self.shutdown.clone();
                    let auth = tokio::select! {
                        r = self.adapter.authenticate(&mut *transport) => r,
                        _ = wait_shutdown(&mut shutdown) => return Err(GenerationOutcome::Shutdown),
                    };
                    queue.extend(auth.map_err(GenerationOutcome::Reconnect)?);
                }
            }
        }
        Ok(())
    }

    fn transition(&mut self, to: StateTag) {
        let from = self.state.tag;
        self.state.tag = to;
        info!("[{}] {from} -> {to} (generation {})", self.label, self.state.generation);
    }
}

fn describe(frame: &RawFrame) -> String {
    if frame.compressed {
        format!("{} compressed bytes", frame.payload.len())
    } else {
        preview(&String::from_utf8_lossy(&frame.payload))
    }
}

pub(crate) fn shutdown_requested(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

/// Resolve once shutdown is signalled or the sender is gone.
pub(crate) async fn wait_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
