//! Channel derivation and the subscribe handshake.
//!
//! The channel list is derived from the market catalog through the exchange's
//! [`ChannelNaming`] table. Sending groups channels into requests of the
//! profile's batch size with ids counting up from 1; acknowledgements are
//! applied to the per-connection [`SubscriptionSet`] as they arrive. A failed
//! channel is logged and never affects the others.

use std::time::Duration;

use tracing::{debug, info, warn};
use tw_core::error::{TwError, TwResult};
use tw_core::ws::Transport;
use tw_core::{AckState, ChannelAck, ChannelSubscription, Market, SubscriptionSet};

use crate::adapter::{ExchangeProfile, FeedAdapter};
use crate::codec::ChannelNaming;

pub struct SubscriptionManager {
    label: &'static str,
    naming: ChannelNaming,
    batch: usize,
    pacing: Option<Duration>,
}

impl SubscriptionManager {
    pub fn new(profile: &ExchangeProfile) -> Self {
        Self {
            label: profile.label(),
            naming: profile.naming,
            batch: profile.subscribe_batch.max(1),
            pacing: profile.subscribe_pacing,
        }
    }

    /// Control channel first (when the exchange has one), then one trade
    /// channel per market in catalog order.
    pub fn build_subscriptions(&self, markets: &[Market]) -> Vec<ChannelSubscription> {
        self.naming
            .control_channel
            .map(ChannelSubscription::new)
            .into_iter()
            .chain(markets.iter().map(|m| ChannelSubscription::new(self.naming.trade_channel(&m.symbol))))
            .collect()
    }

    /// Write every subscribe request. Returns the number of requests sent.
    ///
    /// Each subscription is stamped with the id of the request that carries
    /// it and its slot inside that request. A write failure aborts the
    /// handshake as a transport error.
    pub async fn send<A: FeedAdapter + ?Sized>(
        &self,
        adapter: &A,
        transport: &mut dyn Transport,
        subs: &mut SubscriptionSet,
    ) -> TwResult<usize> {
        for (i, sub) in subs.iter_mut().enumerate() {
            sub.request_id = (i / self.batch) as u64 + 1;
            sub.slot = i % self.batch;
        }

        let channels = subs.channels();
        let mut requests = 0;
        for (i, chunk) in channels.chunks(self.batch).enumerate() {
            if i > 0 {
                if let Some(pause) = self.pacing {
                    tokio::time::sleep(pause).await;
                }
            }
            let text = adapter.encode_subscribe(i as u64 + 1, chunk);
            transport.send_text(text).await?;
            requests += 1;
        }

        info!("[{}] sent {} subscribe request(s) for {} channel(s)", self.label, requests, subs.len());
        Ok(requests)
    }

    /// Apply one acknowledgement and log every channel it resolves.
    pub fn record(&self, subs: &mut SubscriptionSet, ack: &ChannelAck) {
        let resolved = subs.apply(ack);
        if resolved.is_empty() {
            debug!("[{}] ack matched no pending channel: {:?}", self.label, ack.key);
        }
        for r in resolved {
            match r.state {
                AckState::Confirmed => info!("[{}] {}: subscribed", self.label, r.channel),
                AckState::Failed(code) => {
                    let err = TwError::Subscription { channel: r.channel, code };
                    warn!("[{}] {err}", self.label);
                }
                AckState::Pending => {}
            }
        }
    }

    pub fn log_summary(&self, subs: &SubscriptionSet) {
        let summary = subs.summary();
        if summary.pending > 0 || summary.failed > 0 {
            warn!(
                "[{}] subscriptions: {} confirmed, {} failed, {} unacknowledged; streaming anyway",
                self.label, summary.confirmed, summary.failed, summary.pending
            );
        } else {
            info!("[{}] subscriptions: all {} confirmed", self.label, summary.confirmed);
        }
    }
}
