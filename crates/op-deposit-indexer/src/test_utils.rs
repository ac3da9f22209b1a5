//! In-memory collaborator fakes for exercising the worker state machine without a live RPC
//! endpoint or database.
//!
//! Mirrors the derivation pipeline crate's own `test_utils` convention (e.g.
//! `TestChainProvider`): a plain struct with public fields the test populates directly,
//! plus an `async_trait` impl of the real collaborator contract.

use crate::{
    errors::{IndexerError, IndexerErrorKind},
    traits::{DepositBroadcaster, DepositStore, L1Provider},
};
use alloy_primitives::{map::HashMap, Address, B256};
use async_trait::async_trait;
use op_deposit_primitives::{DepositLog, DepositRecord};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

/// A scripted [`L1Provider`] for unit tests.
///
/// Responses are configured by writing to the public fields before the fake is used;
/// nothing here is thread-safe against concurrent writers, matching the single-threaded
/// nature of the worker under test.
#[derive(Debug, Default)]
pub struct FakeL1Provider {
    /// The `(optimism_portal, start_block_l1)` pair returned by `system_config`.
    pub system_config: (Address, u64),
    /// The current L1 safe head.
    pub safe_head: u64,
    /// Transaction hashes considered present on L1.
    pub existing_transactions: Vec<B256>,
    /// Canned `get_logs` responses, keyed by `(address, from_block, to_block)`. Missing
    /// entries return an empty log set.
    pub logs: std::collections::HashMap<(Address, u64, u64), Vec<DepositLog>>,
    /// Canned `get_logs_from` responses, keyed by `(address, from_block)`.
    pub logs_from: std::collections::HashMap<(Address, u64), Vec<DepositLog>>,
    /// If set, `get_logs`/`get_logs_from` return a retryable RPC error.
    pub fail_get_logs: bool,
    /// If set, `poll_filter` returns [`IndexerError::FilterNotFound`].
    pub fail_poll_filter_not_found: bool,
    /// Queued responses for successive `poll_filter` calls.
    pub poll_responses: Mutex<VecDeque<Vec<DepositLog>>>,
    /// Block number -> timestamp overrides for `block_timestamps`. Unlisted blocks default
    /// to `block_number * 12` (a deterministic, monotonic stand-in cadence).
    pub block_timestamp_overrides: std::collections::HashMap<u64, u64>,
    next_filter_id: AtomicU64,
    installed_filters: Mutex<Vec<(Address, u64)>>,
}

impl FakeL1Provider {
    /// Queues a `poll_filter` response.
    pub fn push_poll_response(&self, logs: Vec<DepositLog>) {
        self.poll_responses.lock().unwrap().push_back(logs);
    }

    /// Returns the `(address, from_block)` pairs every installed filter was created with,
    /// in installation order.
    pub fn installed_filters(&self) -> Vec<(Address, u64)> {
        self.installed_filters.lock().unwrap().clone()
    }
}

#[async_trait]
impl L1Provider for FakeL1Provider {
    async fn system_config(&self, _system_config: Address) -> Result<(Address, u64), IndexerErrorKind> {
        Ok(self.system_config)
    }

    async fn safe_head(&self) -> Result<u64, IndexerErrorKind> {
        Ok(self.safe_head)
    }

    async fn transaction_exists(&self, tx_hash: B256) -> Result<bool, IndexerErrorKind> {
        Ok(self.existing_transactions.contains(&tx_hash))
    }

    async fn get_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DepositLog>, IndexerErrorKind> {
        if self.fail_get_logs {
            return Err(IndexerError::Rpc { method: "eth_getLogs", source: "fake failure".into() }
                .retryable());
        }
        Ok(self.logs.get(&(address, from_block, to_block)).cloned().unwrap_or_default())
    }

    async fn get_logs_from(
        &self,
        address: Address,
        from_block: u64,
    ) -> Result<Vec<DepositLog>, IndexerErrorKind> {
        if self.fail_get_logs {
            return Err(IndexerError::Rpc { method: "eth_getLogs", source: "fake failure".into() }
                .retryable());
        }
        Ok(self.logs_from.get(&(address, from_block)).cloned().unwrap_or_default())
    }

    async fn install_filter(
        &self,
        address: Address,
        from_block: u64,
    ) -> Result<String, IndexerErrorKind> {
        let id = self.next_filter_id.fetch_add(1, Ordering::SeqCst);
        self.installed_filters.lock().unwrap().push((address, from_block));
        Ok(format!("fake-filter-{id}"))
    }

    async fn poll_filter(&self, filter_id: &str) -> Result<Vec<DepositLog>, IndexerErrorKind> {
        if self.fail_poll_filter_not_found {
            return Err(IndexerError::FilterNotFound(filter_id.to_string()).retryable());
        }
        Ok(self.poll_responses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn uninstall_filter(&self, _filter_id: &str) -> Result<(), IndexerErrorKind> {
        Ok(())
    }

    async fn block_timestamps(
        &self,
        block_numbers: &[u64],
    ) -> Result<HashMap<u64, u64>, IndexerErrorKind> {
        Ok(block_numbers
            .iter()
            .map(|&n| {
                let ts = self.block_timestamp_overrides.get(&n).copied().unwrap_or(n * 12);
                (n, ts)
            })
            .collect())
    }
}

/// An in-memory [`DepositStore`] for unit tests, enforcing the same upsert-idempotency
/// contract as the Postgres adapter (S7): a duplicate primary key is a no-op update, not a
/// duplicate row.
#[derive(Debug, Default)]
pub struct InMemoryDepositStore {
    records: Mutex<Vec<DepositRecord>>,
}

impl InMemoryDepositStore {
    /// Returns the number of persisted records.
    pub async fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Returns a snapshot of all persisted records.
    pub async fn records(&self) -> Vec<DepositRecord> {
        self.records.lock().unwrap().clone()
    }
}

fn deposit_key(record: &DepositRecord) -> (B256, Address, B256) {
    (record.l1_transaction_hash, record.l1_transaction_origin, record.l2_transaction_hash)
}

#[async_trait]
impl DepositStore for InMemoryDepositStore {
    async fn upsert_deposits(&self, records: &[DepositRecord]) -> Result<(), IndexerErrorKind> {
        let mut guard = self.records.lock().unwrap();
        for record in records {
            match guard.iter_mut().find(|existing| deposit_key(existing) == deposit_key(record)) {
                Some(existing) => *existing = record.clone(),
                None => guard.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn delete_deposits_by_l1_blocks(
        &self,
        blocks: &[u64],
    ) -> Result<u64, IndexerErrorKind> {
        let mut guard = self.records.lock().unwrap();
        let before = guard.len();
        guard.retain(|r| !blocks.contains(&r.l1_block_number));
        Ok((before - guard.len()) as u64)
    }

    async fn last_deposit_l1_block_number(
        &self,
    ) -> Result<(u64, Option<B256>), IndexerErrorKind> {
        let guard = self.records.lock().unwrap();
        Ok(guard
            .iter()
            .max_by_key(|r| r.l1_block_number)
            .map(|r| (r.l1_block_number, Some(r.l1_transaction_hash)))
            .unwrap_or((0, None)))
    }
}

/// A [`DepositBroadcaster`] that records every broadcast batch for inspection.
#[derive(Debug, Default)]
pub struct FakeBroadcaster {
    batches: Mutex<Vec<Vec<DepositRecord>>>,
}

impl FakeBroadcaster {
    /// Returns every batch broadcast so far, in order.
    pub fn batches(&self) -> Vec<Vec<DepositRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

impl DepositBroadcaster for FakeBroadcaster {
    fn broadcast_new_deposits(&self, records: &[DepositRecord]) {
        self.batches.lock().unwrap().push(records.to_vec());
    }
}
