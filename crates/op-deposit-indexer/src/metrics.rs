//! Metrics for the ingestion state machine, gated behind the `metrics`
//! feature so the core crate carries no Prometheus dependency by default.

use lazy_static::lazy_static;
use prometheus::{
    self, register_counter_vec, register_int_counter_vec, register_int_gauge, CounterVec,
    IntCounterVec, IntGauge,
};

lazy_static! {
    /// L1 blocks processed, labeled by mode (`catch_up`/`realtime`).
    pub static ref BLOCKS_PROCESSED: CounterVec = register_counter_vec!(
        "op_deposit_indexer_blocks_processed",
        "Number of L1 blocks processed, by mode",
        &["mode"]
    ).expect("failed to register op_deposit_indexer_blocks_processed");

    /// Deposit records imported, labeled by mode.
    pub static ref DEPOSITS_IMPORTED: CounterVec = register_counter_vec!(
        "op_deposit_indexer_deposits_imported",
        "Number of deposit records imported, by mode",
        &["mode"]
    ).expect("failed to register op_deposit_indexer_deposits_imported");

    /// L1 blocks reconciled away by a detected reorg.
    pub static ref REORGED_BLOCKS: IntCounterVec = register_int_counter_vec!(
        "op_deposit_indexer_reorged_blocks",
        "Number of L1 blocks reconciled away by a reorg",
        &["mode"]
    ).expect("failed to register op_deposit_indexer_reorged_blocks");

    /// The worker's current ingestion mode: 0 = catch_up, 1 = realtime.
    pub static ref CURRENT_MODE: IntGauge = register_int_gauge!(
        "op_deposit_indexer_current_mode",
        "Current ingestion mode (0=catch_up, 1=realtime)"
    ).expect("failed to register op_deposit_indexer_current_mode");

    /// The worker's current `from_block`.
    pub static ref FROM_BLOCK: IntGauge = register_int_gauge!(
        "op_deposit_indexer_from_block",
        "The next L1 block to be fetched"
    ).expect("failed to register op_deposit_indexer_from_block");
}
