//! The error taxonomy for the deposit indexer worker.
//!
//! Mirrors the severity split used throughout the derivation pipeline crate
//! (`PipelineErrorKind::{Critical, Temporary}`): every error the worker can encounter is
//! wrapped as either [`IndexerErrorKind::Fatal`] (propagate out, terminate the worker) or
//! [`IndexerErrorKind::Retryable`] (absorbed by the handler, converted into a delayed
//! re-entry signal).

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// A result type for the worker's event handler.
pub type IndexerResult<T> = Result<T, IndexerErrorKind>;

/// Top-level severity wrapper around [`IndexerError`].
#[derive(Error, Debug)]
pub enum IndexerErrorKind {
    /// A fatal error: the worker stops and does not auto-retry. The supervisor decides
    /// whether to restart the process.
    #[error("fatal indexer error: {0}")]
    Fatal(#[source] IndexerError),
    /// A recoverable error: the handler reschedules itself after the retry interval
    /// without advancing its position.
    #[error("retryable indexer error: {0}")]
    Retryable(#[source] IndexerError),
}

impl IndexerErrorKind {
    /// Returns `true` if this error is fatal and the worker should stop.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// The concrete errors the indexer worker can encounter.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The `SystemConfig` contract returned a start block of zero.
    #[error("system config start block is zero")]
    ZeroStartBlock,
    /// `start_block_l1` regressed behind a non-empty database, indicating a tampered or
    /// stale store.
    #[error("system config start block {start} exceeds last indexed block {last_indexed}")]
    StaleStartBlock {
        /// The start block read from `SystemConfig`.
        start: u64,
        /// The highest block number already present in the deposit store.
        last_indexed: u64,
    },
    /// `start_block_l1` is ahead of the L1 safe head.
    #[error("system config start block {start} exceeds safe head {safe}")]
    StartBlockAheadOfSafeHead {
        /// The start block read from `SystemConfig`.
        start: u64,
        /// The current L1 safe head.
        safe: u64,
    },
    /// The last-indexed L1 transaction hash is no longer present on L1: a reorg predating
    /// the fetcher's own reorg handling has occurred.
    #[error(
        "last indexed l1 transaction {tx_hash} at block {block_number} is no longer present on L1"
    )]
    UnresolvedReorg {
        /// The L1 transaction hash that was stored but is no longer found.
        tx_hash: B256,
        /// The block number it was recorded under.
        block_number: u64,
    },
    /// A JSON-RPC call exhausted its retry budget.
    #[error("rpc call {method} failed after retries: {source}")]
    Rpc {
        /// The JSON-RPC method that failed.
        method: &'static str,
        /// The underlying transport error, rendered as a string to keep this enum
        /// independent of any one transport crate.
        source: String,
    },
    /// The installed log filter was not found by the RPC endpoint (commonly because the
    /// node evicted it after a period of inactivity).
    #[error("log filter {0} not found")]
    FilterNotFound(String),
    /// A deposit store operation failed.
    #[error("deposit store error: {0}")]
    Store(String),
    /// A log failed to decode into a deposit.
    #[error("failed to decode deposit log from {address} at block {block_number}: {source}")]
    Decode {
        /// The emitting contract address.
        address: Address,
        /// The L1 block the log was observed at.
        block_number: u64,
        /// The underlying decode error.
        #[source]
        source: op_deposit_primitives::DepositError,
    },
}

impl IndexerError {
    /// Wraps `self` as an [`IndexerErrorKind::Fatal`].
    pub const fn fatal(self) -> IndexerErrorKind {
        IndexerErrorKind::Fatal(self)
    }

    /// Wraps `self` as an [`IndexerErrorKind::Retryable`].
    pub const fn retryable(self) -> IndexerErrorKind {
        IndexerErrorKind::Retryable(self)
    }
}
