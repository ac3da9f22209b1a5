//! CLI/environment configuration for the deposit indexer binary.
//!
//! A single `clap`-derived struct parsed once in `main`, rather than process-wide config
//! globals.

use alloy_primitives::Address;
use clap::{ArgAction, Parser};
use op_deposit_indexer::IndexerConfig;

/// The `op-deposit-indexer` binary's CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(about = "Indexes Optimism L1 deposits into a relational store")]
pub struct Cli {
    /// Verbosity level (0-4).
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count)]
    pub v: u8,
    /// The L1 JSON-RPC endpoint.
    #[clap(long, env = "OPTIMISM_L1_RPC")]
    pub optimism_l1_rpc: String,
    /// The L1 `SystemConfig` contract address.
    #[clap(long, env = "OPTIMISM_L1_SYSTEM_CONFIG")]
    pub optimism_l1_system_config: Address,
    /// The maximum number of L1 blocks fetched per catch-up window.
    #[clap(long, env = "BATCH_SIZE", default_value_t = op_deposit_indexer::config::DEFAULT_BATCH_SIZE)]
    pub batch_size: u64,
    /// The single-byte type prefix for the L2 deposit transaction encoding.
    #[clap(long, env = "TRANSACTION_TYPE", default_value_t = 0x7E, value_parser = parse_transaction_type)]
    pub transaction_type: u8,
    /// The Postgres connection string backing the deposit store.
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: String,
    /// The socket address the Prometheus metrics endpoint binds to.
    #[clap(long, env = "METRICS_ADDR", default_value = "127.0.0.1:9090")]
    pub metrics_addr: String,
}

impl Cli {
    /// Builds the core [`IndexerConfig`] from the parsed CLI arguments.
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            optimism_l1_rpc: self.optimism_l1_rpc.clone(),
            optimism_l1_system_config: self.optimism_l1_system_config,
            batch_size: self.batch_size,
            transaction_type: self.transaction_type,
        }
    }
}

/// Parses `transaction_type` as a wider integer before narrowing to `u8`, so an
/// out-of-range value is rejected with a readable message at the CLI boundary instead of
/// being silently truncated.
fn parse_transaction_type(s: &str) -> Result<u8, String> {
    let value: i64 = s.parse().map_err(|_| format!("`{s}` is not a valid integer"))?;
    u8::try_from(value)
        .map_err(|_| format!("{value} is out of range for a u8 transaction type (0-255)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_range_transaction_type() {
        let cli = Cli::try_parse_from([
            "op-deposit-indexer",
            "--optimism-l1-rpc",
            "https://example.com",
            "--optimism-l1-system-config",
            "0x1111111111111111111111111111111111111111",
            "--database-url",
            "postgres://localhost/test",
            "--transaction-type",
            "126",
        ])
        .unwrap();
        assert_eq!(cli.transaction_type, 126);
    }

    #[test]
    fn rejects_out_of_range_transaction_type() {
        let err = Cli::try_parse_from([
            "op-deposit-indexer",
            "--optimism-l1-rpc",
            "https://example.com",
            "--optimism-l1-system-config",
            "0x1111111111111111111111111111111111111111",
            "--database-url",
            "postgres://localhost/test",
            "--transaction-type",
            "256",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
