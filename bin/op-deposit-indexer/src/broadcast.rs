//! The default [`DepositBroadcaster`]: a fire-and-forget `tokio::sync::broadcast`
//! channel. No delivery guarantee is assumed by the core; a batch broadcast with no active
//! receivers is simply dropped.

use op_deposit_indexer::DepositBroadcaster;
use op_deposit_primitives::DepositRecord;
use tokio::sync::broadcast;

/// The channel capacity: enough to absorb a few catch-up windows' worth of broadcasts
/// without blocking the worker if no subscriber is currently draining it.
const CHANNEL_CAPACITY: usize = 64;

/// A `tokio::sync::broadcast`-backed [`DepositBroadcaster`].
#[derive(Debug)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<Vec<DepositRecord>>,
}

impl ChannelBroadcaster {
    /// Creates a new broadcaster and returns it alongside a receiver subscribed from
    /// construction time.
    pub fn new() -> (Self, broadcast::Receiver<Vec<DepositRecord>>) {
        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    /// Subscribes an additional receiver to this broadcaster's channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DepositRecord>> {
        self.tx.subscribe()
    }
}

impl DepositBroadcaster for ChannelBroadcaster {
    fn broadcast_new_deposits(&self, records: &[DepositRecord]) {
        // `send` only errors when there are no receivers, which is an expected,
        // non-fatal steady state for this fire-and-forget sink.
        let _ = self.tx.send(records.to_vec());
    }
}
