//! The reorg reconciler.

use crate::{errors::IndexerErrorKind, traits::DepositStore};
use tracing::info;

const LOG_TARGET: &str = "op-deposit-indexer::reorg";

/// Deletes every persisted deposit whose `l1_block_number` is in `removed_blocks`.
///
/// Idempotent: re-applying the same set of block numbers after they have already been
/// deleted deletes zero rows.
pub async fn reconcile_removed(
    store: &dyn DepositStore,
    removed_blocks: &[u64],
) -> Result<u64, IndexerErrorKind> {
    if removed_blocks.is_empty() {
        return Ok(0);
    }
    let deleted = store.delete_deposits_by_l1_blocks(removed_blocks).await?;
    info!(
        target: LOG_TARGET,
        blocks = ?removed_blocks, deleted, "reconciled reorged deposits"
    );
    crate::inc_by!(REORGED_BLOCKS, &["all"], removed_blocks.len() as u64);
    Ok(deleted)
}
