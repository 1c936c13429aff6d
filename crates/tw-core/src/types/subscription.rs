//! Per-connection subscription bookkeeping.
//!
//! A [`SubscriptionSet`] belongs to exactly one connection generation. It is
//! rebuilt from the market catalog on every connect and dropped on reconnect,
//! so acknowledgements from an old socket can never leak into a new one.

use ahash::AHashMap;

use super::message::{AckKey, ChannelAck};

/// Acknowledgement state of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckState {
    Pending,
    Confirmed,
    Failed(String),
}

/// A request to receive one channel's events on the current connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSubscription {
    pub channel: String,
    /// Id of the subscribe request that carried this channel (0 = not sent).
    pub request_id: u64,
    /// Position of this channel inside its request.
    pub slot: usize,
    pub state: AckState,
}

impl ChannelSubscription {
    pub fn new(channel: impl Into<String>) -> Self {
        Self { channel: channel.into(), request_id: 0, slot: 0, state: AckState::Pending }
    }
}

/// Outcome of applying one ack: the channel it resolved and its new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub channel: String,
    pub state: AckState,
}

/// Counts of channels per state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AckSummary {
    pub confirmed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Ordered subscriptions of one connection generation.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subs: Vec<ChannelSubscription>,
    by_channel: AHashMap<String, usize>,
}

impl SubscriptionSet {
    pub fn new(subs: Vec<ChannelSubscription>) -> Self {
        let by_channel = subs.iter().enumerate().map(|(i, s)| (s.channel.clone(), i)).collect();
        Self { subs, by_channel }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelSubscription> {
        self.subs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelSubscription> {
        self.subs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn channels(&self) -> Vec<&str> {
        self.subs.iter().map(|s| s.channel.as_str()).collect()
    }

    /// Apply one acknowledgement. Returns every channel whose state changed
    /// from `Pending`; acks for unknown keys or already-resolved channels
    /// resolve nothing.
    pub fn apply(&mut self, ack: &ChannelAck) -> Vec<Resolved> {
        let state = if ack.success {
            AckState::Confirmed
        } else {
            AckState::Failed(ack.error_code.clone().unwrap_or_else(|| "unknown".into()))
        };

        let targets: Vec<usize> = match &ack.key {
            AckKey::Channel(name) => self.by_channel.get(name).copied().into_iter().collect(),
            AckKey::Slot { request, index } => self
                .subs
                .iter()
                .position(|s| s.request_id == *request && s.slot == *index)
                .into_iter()
                .collect(),
            AckKey::Request(request) => {
                (0..self.subs.len()).filter(|&i| self.subs[i].request_id == *request).collect()
            }
        };

        let mut resolved = Vec::new();
        for i in targets {
            let sub = &mut self.subs[i];
            if sub.state == AckState::Pending {
                sub.state = state.clone();
                resolved.push(Resolved { channel: sub.channel.clone(), state: state.clone() });
            }
        }
        resolved
    }

    pub fn summary(&self) -> AckSummary {
        self.subs.iter().fold(AckSummary::default(), |mut acc, s| {
            match s.state {
                AckState::Pending => acc.pending += 1,
                AckState::Confirmed => acc.confirmed += 1,
                AckState::Failed(_) => acc.failed += 1,
            }
            acc
        })
    }

    /// `true` once no channel is waiting for an acknowledgement.
    pub fn all_resolved(&self) -> bool {
        self.subs.iter().all(|s| s.state != AckState::Pending)
    }
}
