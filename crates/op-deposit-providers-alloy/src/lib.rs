//! Alloy-backed L1 JSON-RPC provider for the Optimism L1 deposit indexer.
//!
//! This crate is a thin adapter: it implements [`op_deposit_indexer::L1Provider`] over
//! `alloy-provider`/`reqwest`. The ingestion state machine in `op-deposit-indexer` depends
//! only on that trait and never on anything here.

mod macros;

#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::*;

pub mod alloy_provider;
pub use alloy_provider::AlloyL1Provider;
