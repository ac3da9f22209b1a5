//! A Postgres-backed [`DepositStore`] over `sqlx`.

use alloy_primitives::B256;
use async_trait::async_trait;
use op_deposit_indexer::{
    errors::{IndexerError, IndexerErrorKind},
    traits::DepositStore,
};
use op_deposit_primitives::DepositRecord;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;

const LOG_TARGET: &str = "op-deposit-db::store";

/// Postgres-backed [`DepositStore`], matching the three operations the core worker
/// requires: idempotent upsert, reorg deletion, and resume-point lookup.
#[derive(Debug, Clone)]
pub struct PgDepositStore {
    pool: PgPool,
}

impl PgDepositStore {
    /// Connects to `database_url` with a small bounded pool and runs pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, IndexerErrorKind> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| {
                IndexerError::Store(format!("failed to connect to database: {e}")).fatal()
            })?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wraps an already-constructed pool, e.g. one built against a test container.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations against the connected database.
    pub async fn migrate(&self) -> Result<(), IndexerErrorKind> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| IndexerError::Store(format!("failed to run migrations: {e}")).fatal())?;
        Ok(())
    }
}

/// Postgres has no unsigned integer column type; block numbers are stored as `BIGINT`
/// (`i64`) and are never expected to approach `i64::MAX` in practice.
fn block_number_to_sql(n: u64) -> Result<i64, IndexerErrorKind> {
    i64::try_from(n).map_err(|_| {
        IndexerError::Store(format!("block number {n} does not fit in a signed 64-bit column"))
            .retryable()
    })
}

#[async_trait]
impl DepositStore for PgDepositStore {
    async fn upsert_deposits(&self, records: &[DepositRecord]) -> Result<(), IndexerErrorKind> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            IndexerError::Store(format!("failed to start transaction: {e}")).retryable()
        })?;

        for record in records {
            let block_number = block_number_to_sql(record.l1_block_number)?;
            let block_timestamp = record.l1_block_timestamp.map(block_number_to_sql).transpose()?;

            sqlx::query(
                r#"
                INSERT INTO deposits (
                    l1_transaction_hash, l1_transaction_origin, l2_transaction_hash,
                    l1_block_number, l1_block_timestamp
                )
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (l1_transaction_hash, l1_transaction_origin, l2_transaction_hash)
                DO UPDATE SET
                    l1_block_number = EXCLUDED.l1_block_number,
                    l1_block_timestamp = EXCLUDED.l1_block_timestamp
                "#,
            )
            .bind(record.l1_transaction_hash.as_slice())
            .bind(record.l1_transaction_origin.as_slice())
            .bind(record.l2_transaction_hash.as_slice())
            .bind(block_number)
            .bind(block_timestamp)
            .execute(&mut *tx)
            .await
            .map_err(|e| IndexerError::Store(format!("failed to upsert deposit: {e}")).retryable())?;
        }

        tx.commit().await.map_err(|e| {
            IndexerError::Store(format!("failed to commit deposit batch: {e}")).retryable()
        })?;
        Ok(())
    }

    async fn delete_deposits_by_l1_blocks(&self, blocks: &[u64]) -> Result<u64, IndexerErrorKind> {
        if blocks.is_empty() {
            return Ok(0);
        }
        let blocks: Vec<i64> =
            blocks.iter().copied().map(block_number_to_sql).collect::<Result<_, _>>()?;

        let result = sqlx::query("DELETE FROM deposits WHERE l1_block_number = ANY($1)")
            .bind(&blocks)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                IndexerError::Store(format!("failed to delete reorged deposits: {e}")).retryable()
            })?;

        let deleted = result.rows_affected();
        info!(target: LOG_TARGET, blocks = ?blocks, deleted, "deleted deposits for reorged l1 blocks");
        Ok(deleted)
    }

    async fn last_deposit_l1_block_number(&self) -> Result<(u64, Option<B256>), IndexerErrorKind> {
        let row = sqlx::query(
            "SELECT l1_block_number, l1_transaction_hash FROM deposits \
             ORDER BY l1_block_number DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            IndexerError::Store(format!("failed to query last indexed block: {e}")).retryable()
        })?;

        let Some(row) = row else {
            return Ok((0, None));
        };

        let block_number: i64 = row.try_get("l1_block_number").map_err(|e| {
            IndexerError::Store(format!("malformed l1_block_number column: {e}")).retryable()
        })?;
        let tx_hash: Vec<u8> = row.try_get("l1_transaction_hash").map_err(|e| {
            IndexerError::Store(format!("malformed l1_transaction_hash column: {e}")).retryable()
        })?;

        Ok((block_number as u64, Some(B256::from_slice(&tx_hash))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_number_round_trips_through_sql_conversion() {
        assert_eq!(block_number_to_sql(100).unwrap(), 100i64);
    }

    #[test]
    fn block_number_overflow_is_retryable_not_fatal() {
        let err = block_number_to_sql(u64::MAX).unwrap_err();
        assert!(!err.is_fatal());
    }
}
