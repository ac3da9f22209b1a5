//! The realtime engine.

use crate::{
    derive::{derive_records, partition_removed},
    errors::{IndexerError, IndexerErrorKind},
    reorg::reconcile_removed,
    state::WorkerState,
    traits::{DepositBroadcaster, DepositStore, L1Provider},
};
use op_deposit_primitives::Mode;
use tracing::{info, warn};

const LOG_TARGET: &str = "op-deposit-indexer::realtime";

/// The outcome of attempting to enter realtime mode.
#[derive(Debug)]
pub enum RealtimeEntry {
    /// The worker fell behind while preparing the mode switch and returns to catch-up with
    /// a refreshed safe head.
    FellBehind(WorkerState),
    /// The gap was closed, a filter installed, and the worker is now in realtime mode.
    Entered(WorkerState),
    /// An RPC or persistence call failed; retry the whole entry step after the retry
    /// interval.
    Retry(WorkerState),
}

/// Attempts to transition from catch-up into realtime mode.
pub async fn enter_realtime(
    mut state: WorkerState,
    l1: &dyn L1Provider,
    store: &dyn DepositStore,
    broadcaster: &dyn DepositBroadcaster,
) -> RealtimeEntry {
    debug_assert_eq!(state.mode, Mode::CatchUp);

    let new_safe = match l1.safe_head().await {
        Ok(s) => s,
        Err(e) => {
            warn!(target: LOG_TARGET, error = %e, "failed to refresh safe head, retrying mode switch");
            return RealtimeEntry::Retry(state);
        }
    };

    // S6: the worker has fallen behind during mode-switch preparation.
    if new_safe.saturating_sub(state.safe_block) + 1 > state.batch_size {
        info!(
            target: LOG_TARGET,
            old_safe = state.safe_block, new_safe,
            "fell behind during mode switch, returning to catch-up"
        );
        state.safe_block = new_safe;
        return RealtimeEntry::FellBehind(state);
    }

    let gap_from = state.safe_block.max(state.from_block);
    let gap_logs = match l1.get_logs_from(state.optimism_portal, gap_from).await {
        Ok(logs) => logs,
        Err(e) => {
            warn!(target: LOG_TARGET, error = %e, "failed to fetch realtime gap logs, retrying");
            return RealtimeEntry::Retry(state);
        }
    };

    let filter_id = match l1.install_filter(state.optimism_portal, gap_from).await {
        Ok(id) => id,
        Err(e) => {
            warn!(target: LOG_TARGET, error = %e, "failed to install log filter, retrying");
            return RealtimeEntry::Retry(state);
        }
    };

    let (removed, kept) = partition_removed(gap_logs);
    if !removed.is_empty() {
        if let Err(e) = reconcile_removed(store, &removed).await {
            warn!(target: LOG_TARGET, error = %e, "failed to reconcile gap reorg, retrying");
            return RealtimeEntry::Retry(state);
        }
    }
    let records = derive_records(l1, state.transaction_type, &kept).await;
    if let Err(e) = store.upsert_deposits(&records).await {
        warn!(target: LOG_TARGET, error = %e, "failed to import realtime gap logs, retrying");
        return RealtimeEntry::Retry(state);
    }
    broadcaster.broadcast_new_deposits(&records);
    crate::inc_by!(DEPOSITS_IMPORTED, &["realtime"], records.len() as f64);

    state.safe_block = new_safe;
    state.mode = Mode::Realtime;
    state.filter_id = Some(filter_id);
    state.check_interval = estimate_check_interval(l1, new_safe).await;
    state.from_block = gap_from;

    info!(
        target: LOG_TARGET, from_block = gap_from, safe_block = new_safe,
        check_interval = ?state.check_interval, "entered realtime mode"
    );
    RealtimeEntry::Entered(state)
}

/// Estimates the realtime poll interval from observed L1 block cadence: the
/// timestamp delta between the safe head and its parent. Falls back to
/// [`crate::state::DEFAULT_CHECK_INTERVAL`] if either lookup fails.
async fn estimate_check_interval(l1: &dyn L1Provider, safe_block: u64) -> core::time::Duration {
    if safe_block == 0 {
        return crate::state::DEFAULT_CHECK_INTERVAL;
    }
    let timestamps = match l1.block_timestamps(&[safe_block - 1, safe_block]).await {
        Ok(t) => t,
        Err(_) => return crate::state::DEFAULT_CHECK_INTERVAL,
    };
    match (timestamps.get(&(safe_block - 1)), timestamps.get(&safe_block)) {
        (Some(&prev), Some(&curr)) if curr > prev => core::time::Duration::from_secs(curr - prev),
        _ => crate::state::DEFAULT_CHECK_INTERVAL,
    }
}

/// The outcome of a single realtime poll.
#[derive(Debug)]
pub enum PollOutcome {
    /// The filter changes were fetched and processed; stay in realtime mode.
    Polled(WorkerState),
    /// The RPC endpoint reported the filter no longer exists; the caller should run
    /// [`update_filter`] after the retry interval.
    FilterLost(WorkerState),
    /// A transient RPC or persistence error occurred; retry the poll after the retry
    /// interval without otherwise changing state.
    Retry(WorkerState),
}

/// Polls `getFilterChanges` once and processes any returned logs.
pub async fn poll(
    state: WorkerState,
    l1: &dyn L1Provider,
    store: &dyn DepositStore,
    broadcaster: &dyn DepositBroadcaster,
) -> PollOutcome {
    debug_assert_eq!(state.mode, Mode::Realtime);
    let Some(filter_id) = state.filter_id.clone() else {
        return PollOutcome::FilterLost(state);
    };

    let logs = match l1.poll_filter(&filter_id).await {
        Ok(logs) => logs,
        Err(IndexerErrorKind::Retryable(IndexerError::FilterNotFound(_))) => {
            warn!(target: LOG_TARGET, filter_id, "log filter lost, scheduling rebuild");
            return PollOutcome::FilterLost(state);
        }
        Err(e) => {
            warn!(target: LOG_TARGET, error = %e, "getFilterChanges failed, retrying");
            return PollOutcome::Retry(state);
        }
    };

    let (removed, kept) = partition_removed(logs);
    if !removed.is_empty() {
        if let Err(e) = reconcile_removed(store, &removed).await {
            warn!(target: LOG_TARGET, error = %e, "failed to reconcile reorg, retrying poll");
            return PollOutcome::Retry(state);
        }
    }

    let records = derive_records(l1, state.transaction_type, &kept).await;
    if !records.is_empty() {
        if let Err(e) = store.upsert_deposits(&records).await {
            warn!(target: LOG_TARGET, error = %e, "failed to import realtime deposits, retrying");
            return PollOutcome::Retry(state);
        }
        broadcaster.broadcast_new_deposits(&records);
        info!(target: LOG_TARGET, imported = records.len(), "imported realtime deposits");
        crate::inc_by!(DEPOSITS_IMPORTED, &["realtime"], records.len() as f64);
    }

    PollOutcome::Polled(state)
}

/// Rebuilds a lost filter from the DB-derived resume point.
///
/// This is the single path by which a lost filter is recovered: it never trusts the
/// worker's in-memory `from_block`, re-deriving strictly from persisted state.
pub async fn update_filter(
    mut state: WorkerState,
    l1: &dyn L1Provider,
    store: &dyn DepositStore,
) -> Result<WorkerState, IndexerErrorKind> {
    let (last_indexed_block, _) = store.last_deposit_l1_block_number().await?;
    let from_block = last_indexed_block + 1;
    let filter_id = l1.install_filter(state.optimism_portal, from_block).await?;
    state.filter_id = Some(filter_id);
    state.from_block = from_block;
    info!(target: LOG_TARGET, from_block, "rebuilt log filter");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeBroadcaster, FakeL1Provider, InMemoryDepositStore};
    use alloy_primitives::address;

    fn portal() -> alloy_primitives::Address {
        address!("2222222222222222222222222222222222222222")
    }

    fn base_state(safe_block: u64, batch_size: u64) -> WorkerState {
        WorkerState {
            mode: Mode::CatchUp,
            start_block: 0,
            from_block: safe_block + 1,
            safe_block,
            optimism_portal: portal(),
            batch_size,
            transaction_type: 0x7E,
            filter_id: None,
            check_interval: core::time::Duration::from_secs(12),
        }
    }

    #[tokio::test]
    async fn s6_falls_behind_during_mode_switch() {
        // new_safe - safe_block + 1 = 800 > batch_size 500.
        let mut l1 = FakeL1Provider::default();
        l1.safe_head = 1700 + 800 - 1;
        let store = InMemoryDepositStore::default();
        let broadcaster = FakeBroadcaster::default();

        let state = base_state(1700, 500);
        match enter_realtime(state, &l1, &store, &broadcaster).await {
            RealtimeEntry::FellBehind(next) => {
                assert_eq!(next.mode, Mode::CatchUp);
                assert_eq!(next.safe_block, l1.safe_head);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn enters_realtime_and_installs_filter() {
        let mut l1 = FakeL1Provider::default();
        l1.safe_head = 1701;
        let store = InMemoryDepositStore::default();
        let broadcaster = FakeBroadcaster::default();

        let state = base_state(1700, 500);
        match enter_realtime(state, &l1, &store, &broadcaster).await {
            RealtimeEntry::Entered(next) => {
                assert_eq!(next.mode, Mode::Realtime);
                assert!(next.filter_id.is_some());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn s5_filter_loss_triggers_rebuild_from_db() {
        let mut l1 = FakeL1Provider::default();
        l1.safe_head = 1701;
        let store = InMemoryDepositStore::default();
        store
            .upsert_deposits(&[op_deposit_primitives::DepositRecord {
                l1_block_number: 1800,
                l1_block_timestamp: None,
                l1_transaction_hash: alloy_primitives::B256::ZERO,
                l1_transaction_origin: Default::default(),
                l2_transaction_hash: alloy_primitives::B256::ZERO,
            }])
            .await
            .unwrap();
        let broadcaster = FakeBroadcaster::default();

        let mut state = base_state(1700, 500);
        state.mode = Mode::Realtime;
        state.filter_id = Some("stale".into());
        l1.fail_poll_filter_not_found = true;

        match poll(state.clone(), &l1, &store, &broadcaster).await {
            PollOutcome::FilterLost(_) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }

        l1.fail_poll_filter_not_found = false;
        let rebuilt = update_filter(state, &l1, &store).await.unwrap();
        assert_eq!(rebuilt.from_block, 1801);
        assert!(rebuilt.filter_id.is_some());
    }
}
