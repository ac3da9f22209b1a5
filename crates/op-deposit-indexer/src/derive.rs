//! Turns decoded, non-removed logs into persistable [`DepositRecord`]s.
//!
//! This is the glue between the pure derivation in `op-deposit-primitives` and the
//! asynchronous block-timestamp lookup: it has suspension points (the timestamp
//! RPC call) but no suspension inside the per-log hashing itself.

use crate::traits::L1Provider;
use op_deposit_primitives::{decode_deposit, source_hash, DepositLog, DepositRecord};
use tracing::warn;

const LOG_TARGET: &str = "op-deposit-indexer::derive";

/// Decodes and hashes every log in `logs`, attaching block timestamps where available.
///
/// Logs that fail to decode (malformed ABI payload, wrong version, wrong selector) are
/// logged and skipped rather than aborting the batch — see the deriver's error taxonomy.
/// A failed timestamp lookup degrades to `None` timestamps rather than failing the whole
/// batch. `logs` must already have `removed=true` entries
/// filtered out by the caller.
pub async fn derive_records(
    l1: &dyn L1Provider,
    transaction_type: u8,
    logs: &[DepositLog],
) -> Vec<DepositRecord> {
    let mut decoded = Vec::with_capacity(logs.len());
    for log in logs {
        debug_assert!(!log.removed, "reorg reconciler must filter removed logs before deriving");
        match decode_deposit(log) {
            Ok(raw) => decoded.push((log, raw)),
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    block_number = log.block_number,
                    log_index = log.log_index,
                    error = %e,
                    "skipping undecodable deposit log"
                );
            }
        }
    }

    let mut block_numbers: Vec<u64> = decoded.iter().map(|(log, _)| log.block_number).collect();
    block_numbers.sort_unstable();
    block_numbers.dedup();
    let timestamps = l1.block_timestamps(&block_numbers).await.unwrap_or_else(|e| {
        warn!(target: LOG_TARGET, error = %e, "block timestamp lookup failed, storing null timestamps");
        Default::default()
    });

    decoded
        .into_iter()
        .map(|(log, raw)| {
            let sh = source_hash(log.block_hash, log.log_index);
            let l2_transaction_hash =
                op_deposit_primitives::l2_transaction_hash(&raw, sh, transaction_type);
            DepositRecord {
                l1_block_number: log.block_number,
                l1_block_timestamp: timestamps.get(&log.block_number).copied(),
                l1_transaction_hash: log.transaction_hash,
                l1_transaction_origin: raw.from,
                l2_transaction_hash,
            }
        })
        .collect()
}

/// Splits a batch of logs into `(removed_block_numbers, non_removed_logs)`.
pub fn partition_removed(logs: Vec<DepositLog>) -> (Vec<u64>, Vec<DepositLog>) {
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(logs.len());
    for log in logs {
        if log.removed {
            removed.push(log.block_number);
        } else {
            kept.push(log);
        }
    }
    removed.sort_unstable();
    removed.dedup();
    (removed, kept)
}
