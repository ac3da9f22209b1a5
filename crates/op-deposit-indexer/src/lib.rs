//! The ingestion state machine for the Optimism L1 deposit indexer.
//!
//! This crate owns the core engineering from the design: the two-mode catch-up/realtime
//! state machine, the reorg reconciler, and the worker loop that drives them. It depends
//! only on the collaborator traits in [`traits`] — concrete JSON-RPC and persistence
//! adapters live in `op-deposit-providers-alloy` and `op-deposit-db`; bit-exact deposit
//! derivation lives in `op-deposit-primitives`.

mod macros;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod config;
pub use config::IndexerConfig;

pub mod errors;
pub use errors::{IndexerError, IndexerErrorKind, IndexerResult};

pub mod traits;
pub use traits::{DepositBroadcaster, DepositStore, L1Provider};

pub mod state;
pub use state::WorkerState;

pub mod derive;

pub mod bootstrap;
pub use bootstrap::bootstrap;

pub mod catchup;
pub mod realtime;
pub mod reorg;

pub mod worker;
pub use worker::Worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
