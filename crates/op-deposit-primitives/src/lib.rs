//! Core data model and bit-exact derivation primitives for the Optimism L1 deposit indexer.
//!
//! This crate has no knowledge of JSON-RPC transports or persistence engines: it only
//! describes the shapes that flow between them (`DepositLog`, `DepositRecord`) and the
//! pure derivation that turns one into the other (`deposit::decode_deposit`).

pub mod deposit;
pub use deposit::{
    decode_deposit, l2_transaction_hash, source_hash, DepositError, DepositLog, DepositRecord,
    RawDeposit, DEPOSIT_EVENT_ABI_HASH,
};

pub mod mode;
pub use mode::Mode;
