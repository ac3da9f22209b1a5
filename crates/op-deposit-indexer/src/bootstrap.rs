//! The bootstrapper.

use crate::{
    config::IndexerConfig,
    errors::{IndexerError, IndexerErrorKind},
    state::{WorkerState, DEFAULT_CHECK_INTERVAL},
    traits::{DepositStore, L1Provider},
};
use op_deposit_primitives::Mode;
use tracing::{info, warn};

const LOG_TARGET: &str = "op-deposit-indexer::bootstrap";

/// Reads `SystemConfig`, computes the resume point, validates the startup invariants, and
/// produces the worker's initial [`WorkerState`].
///
/// All failures returned here are considered part of bootstrap: configuration and
/// consistency errors are [`IndexerErrorKind::Fatal`]; RPC/store errors encountered while
/// reading bootstrap state are also treated as fatal to bootstrap itself (the caller's
/// supervisor may restart the process, which re-enters this function).
pub async fn bootstrap(
    config: &IndexerConfig,
    l1: &dyn L1Provider,
    store: &dyn DepositStore,
) -> Result<WorkerState, IndexerErrorKind> {
    config.validate()?;

    let (optimism_portal, start_block_l1) =
        l1.system_config(config.optimism_l1_system_config).await?;

    if optimism_portal.is_zero() {
        return Err(IndexerError::Config("SystemConfig returned a zero OptimismPortal address".into())
            .fatal());
    }
    if start_block_l1 == 0 {
        return Err(IndexerError::ZeroStartBlock.fatal());
    }

    let (last_indexed_block, last_indexed_tx_hash) = store.last_deposit_l1_block_number().await?;

    if last_indexed_block != 0 && start_block_l1 > last_indexed_block {
        return Err(IndexerError::StaleStartBlock {
            start: start_block_l1,
            last_indexed: last_indexed_block,
        }
        .fatal());
    }

    if let Some(tx_hash) = last_indexed_tx_hash {
        if !l1.transaction_exists(tx_hash).await? {
            return Err(IndexerError::UnresolvedReorg { tx_hash, block_number: last_indexed_block }
                .fatal());
        }
    }

    let safe_block = l1.safe_head().await?;
    if start_block_l1 > safe_block {
        return Err(
            IndexerError::StartBlockAheadOfSafeHead { start: start_block_l1, safe: safe_block }
                .fatal(),
        );
    }

    let from_block = start_block_l1.max(last_indexed_block);

    // The worker always starts in `catch_up`; if `from_block > safe_block` the worker's
    // first loop iteration immediately performs the catch-up-to-realtime transition without
    // issuing a fetch, which is equivalent to jumping directly to realtime but keeps filter
    // installation on the single `enter_realtime` path rather than duplicating it here.
    info!(target: LOG_TARGET, from_block, safe_block, "bootstrapped deposit indexer worker");
    if from_block > safe_block {
        warn!(
            target: LOG_TARGET,
            from_block, safe_block, "resume point is ahead of safe head, will jump to realtime"
        );
    }

    Ok(WorkerState {
        mode: Mode::CatchUp,
        start_block: start_block_l1,
        from_block,
        safe_block,
        optimism_portal,
        batch_size: config.batch_size,
        transaction_type: config.transaction_type,
        filter_id: None,
        check_interval: DEFAULT_CHECK_INTERVAL,
    })
}
