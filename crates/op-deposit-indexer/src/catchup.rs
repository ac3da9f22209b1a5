//! The catch-up engine.

use crate::{
    derive::{derive_records, partition_removed},
    reorg::reconcile_removed,
    state::WorkerState,
    traits::{DepositBroadcaster, DepositStore, L1Provider},
};
use op_deposit_primitives::Mode;
use tracing::{info, warn};

const LOG_TARGET: &str = "op-deposit-indexer::catchup";

/// The outcome of a single catch-up step.
#[derive(Debug)]
pub enum CatchUpStep {
    /// A window was fetched and imported; `from_block` advanced. The caller should signal
    /// another `fetch` immediately.
    Advanced(WorkerState),
    /// The window reached `safe_block`; the caller should signal `switch_to_realtime`.
    ReachedSafeHead(WorkerState),
    /// The RPC request or persistence import failed; the caller should wait
    /// [`crate::config::RETRY_INTERVAL`] and retry the same step. `from_block` is
    /// unchanged.
    Retry(WorkerState),
}

/// Performs one catch-up window fetch-derive-import-broadcast cycle.
///
/// Entry invariant: `state.from_block <= state.safe_block` and `state.mode ==
/// Mode::CatchUp`.
pub async fn step(
    mut state: WorkerState,
    l1: &dyn L1Provider,
    store: &dyn DepositStore,
    broadcaster: &dyn DepositBroadcaster,
) -> CatchUpStep {
    debug_assert_eq!(state.mode, Mode::CatchUp);
    debug_assert!(state.from_block <= state.safe_block);

    let to_block = (state.from_block + state.batch_size).min(state.safe_block);

    let logs = match l1.get_logs(state.optimism_portal, state.from_block, to_block).await {
        Ok(logs) => logs,
        Err(e) => {
            warn!(
                target: LOG_TARGET,
                from_block = state.from_block, to_block, error = %e,
                "get_logs failed, rescheduling catch-up step"
            );
            return CatchUpStep::Retry(state);
        }
    };

    // `getLogs` responses are not expected to carry `removed=true` entries, but the
    // reconciler is idempotent and cheap, so we run it unconditionally for defense in depth.
    let (removed, kept) = partition_removed(logs);
    if !removed.is_empty() {
        if let Err(e) = reconcile_removed(store, &removed).await {
            warn!(target: LOG_TARGET, error = %e, "failed to reconcile removed logs during catch-up, rescheduling");
            return CatchUpStep::Retry(state);
        }
    }

    let records = derive_records(l1, state.transaction_type, &kept).await;

    if let Err(e) = store.upsert_deposits(&records).await {
        warn!(
            target: LOG_TARGET,
            from_block = state.from_block, to_block, error = %e,
            "failed to import deposit batch, rescheduling catch-up step"
        );
        return CatchUpStep::Retry(state);
    }

    broadcaster.broadcast_new_deposits(&records);
    info!(
        target: LOG_TARGET,
        from_block = state.from_block, to_block, imported = records.len(),
        "imported catch-up window"
    );

    let blocks_in_window = to_block - state.from_block + 1;
    crate::inc_by!(BLOCKS_PROCESSED, &["catch_up"], blocks_in_window as f64);
    crate::inc_by!(DEPOSITS_IMPORTED, &["catch_up"], records.len() as f64);

    state.from_block = to_block + 1;

    if to_block == state.safe_block {
        CatchUpStep::ReachedSafeHead(state)
    } else {
        CatchUpStep::Advanced(state)
    }
}
