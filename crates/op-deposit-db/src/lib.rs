//! Postgres-backed persistence for the Optimism L1 deposit indexer.
//!
//! Implements [`op_deposit_indexer::DepositStore`] over a `sqlx::PgPool`. The core ingestion
//! state machine in `op-deposit-indexer` depends only on that trait; everything in this
//! crate — the physical schema, migrations, and connection pool — is an integration detail
//! confined here.

mod store;
pub use store::PgDepositStore;
