//! The worker's owned state.

use alloy_primitives::Address;
use core::time::Duration;
use op_deposit_primitives::Mode;

/// The default poll interval used in realtime mode until the first cadence observation
/// refines it: roughly one L1 block.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(12);

/// The worker's state, owned exclusively by the worker and mutated only by its event
/// handler. Nothing outside `op-deposit-indexer` ever mutates this directly.
#[derive(Debug, Clone)]
pub struct WorkerState {
    /// The current ingestion mode.
    pub mode: Mode,
    /// The L1 block number the worker was launched against. Immutable after
    /// construction.
    pub start_block: u64,
    /// The next L1 block to query in catch-up mode. Monotonically non-decreasing.
    pub from_block: u64,
    /// The last known L1 safe head, refreshed at each mode transition.
    pub safe_block: u64,
    /// The `OptimismPortal` contract address emitting `TransactionDeposited`.
    pub optimism_portal: Address,
    /// The maximum number of blocks per catch-up window.
    pub batch_size: u64,
    /// The single-byte type prefix for L2 deposit transaction encoding.
    pub transaction_type: u8,
    /// The active L1 log filter id, set only in realtime mode.
    pub filter_id: Option<String>,
    /// The interval between realtime polls.
    pub check_interval: Duration,
}

impl WorkerState {
    /// Asserts the catch-up mode invariant: `start_block <= from_block <=
    /// safe_block + 1`.
    ///
    /// Debug-only: this is an internal consistency check on state this crate fully owns,
    /// not a validation of external input.
    #[cfg(debug_assertions)]
    pub fn debug_assert_invariants(&self) {
        if self.mode == Mode::CatchUp {
            debug_assert!(self.from_block >= self.start_block);
            debug_assert!(self.from_block <= self.safe_block + 1);
        } else {
            debug_assert!(self.filter_id.is_some());
            debug_assert!(!self.check_interval.is_zero());
        }
    }
}
