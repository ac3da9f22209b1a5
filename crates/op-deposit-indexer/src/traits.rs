//! Collaborator contracts.
//!
//! The worker depends only on these traits, never on any concrete transport or storage
//! engine. `op-deposit-providers-alloy` and `op-deposit-db` ship concrete adapters; the
//! worker's own tests exercise fakes from [`crate::test_utils`].

use crate::errors::IndexerErrorKind;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use op_deposit_primitives::{DepositLog, DepositRecord};

/// The subset of L1 JSON-RPC methods the indexer core requires.
#[async_trait]
pub trait L1Provider: Send + Sync {
    /// Reads the `(optimism_portal, start_block_l1)` pair from the `SystemConfig`
    /// contract at `system_config` via `eth_call`.
    async fn system_config(
        &self,
        system_config: Address,
    ) -> Result<(Address, u64), IndexerErrorKind>;

    /// Returns the current L1 safe head block number.
    async fn safe_head(&self) -> Result<u64, IndexerErrorKind>;

    /// Returns `true` if the given L1 transaction hash is present on L1.
    async fn transaction_exists(&self, tx_hash: B256) -> Result<bool, IndexerErrorKind>;

    /// Fetches `TransactionDeposited` logs emitted by `address` in `[from_block, to_block]`.
    ///
    /// Logs are returned in the order the RPC endpoint returned them.
    async fn get_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DepositLog>, IndexerErrorKind>;

    /// Fetches `TransactionDeposited` logs in `[from_block, "latest"]`.
    async fn get_logs_from(
        &self,
        address: Address,
        from_block: u64,
    ) -> Result<Vec<DepositLog>, IndexerErrorKind>;

    /// Installs a new log filter for `TransactionDeposited` events on `address`, starting
    /// at `from_block` and open-ended (`toBlock = "latest"`). Returns the opaque filter id.
    async fn install_filter(
        &self,
        address: Address,
        from_block: u64,
    ) -> Result<String, IndexerErrorKind>;

    /// Polls `getFilterChanges` for the given filter id.
    ///
    /// Returns [`IndexerErrorKind::Retryable`] wrapping [`crate::errors::IndexerError::FilterNotFound`]
    /// if the RPC endpoint reports the filter no longer exists.
    async fn poll_filter(&self, filter_id: &str) -> Result<Vec<DepositLog>, IndexerErrorKind>;

    /// Uninstalls a log filter. Best-effort: failures are logged by the caller, never fatal
    /// on shutdown.
    async fn uninstall_filter(&self, filter_id: &str) -> Result<(), IndexerErrorKind>;

    /// Batched block timestamp lookup. Implementations should issue one
    /// `eth_getBlockByNumber` request per unique block number, batched at the transport
    /// layer where supported. Missing or failed lookups are simply absent from the
    /// returned map; the caller substitutes `None`.
    async fn block_timestamps(
        &self,
        block_numbers: &[u64],
    ) -> Result<alloy_primitives::map::HashMap<u64, u64>, IndexerErrorKind>;
}

/// The subset of persistence operations the indexer core requires.
#[async_trait]
pub trait DepositStore: Send + Sync {
    /// Idempotently upserts a batch of deposit records in a single atomic call.
    async fn upsert_deposits(&self, records: &[DepositRecord]) -> Result<(), IndexerErrorKind>;

    /// Deletes all deposits with `l1_block_number` in `blocks`, returning the number of
    /// rows deleted.
    async fn delete_deposits_by_l1_blocks(
        &self,
        blocks: &[u64],
    ) -> Result<u64, IndexerErrorKind>;

    /// Returns `(block_number, l1_transaction_hash)` of the highest-numbered persisted
    /// deposit, or `(0, None)` if the store is empty.
    async fn last_deposit_l1_block_number(
        &self,
    ) -> Result<(u64, Option<B256>), IndexerErrorKind>;
}

/// A fire-and-forget sink for newly-imported deposit batches.
///
/// No delivery guarantee is assumed by the core; broadcast failures are ignored.
pub trait DepositBroadcaster: Send + Sync {
    /// Announces that `records` were just imported.
    fn broadcast_new_deposits(&self, records: &[DepositRecord]);
}
