//! Configuration read once at bootstrap.

use crate::errors::{IndexerError, IndexerErrorKind};
use alloy_primitives::Address;
use core::time::Duration;

/// The retry interval used after any transient RPC or persistence failure.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(180);

/// The default maximum number of blocks per catch-up window.
pub const DEFAULT_BATCH_SIZE: u64 = 500;

/// Configuration for the deposit indexer worker, read once at bootstrap.
///
/// A plain, `clap`-populated struct passed explicitly to the worker constructor rather than
/// read from process-wide globals.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// The L1 JSON-RPC endpoint URL.
    pub optimism_l1_rpc: String,
    /// The L1 `SystemConfig` contract address.
    pub optimism_l1_system_config: Address,
    /// The maximum number of L1 blocks per catch-up window.
    pub batch_size: u64,
    /// The single-byte type prefix for the L2 deposit transaction encoding (typically
    /// `0x7E`).
    pub transaction_type: u8,
}

impl IndexerConfig {
    /// Validates the configuration, returning a fatal [`IndexerErrorKind::Fatal`] wrapping
    /// an [`IndexerError::Config`] for the first violation found.
    ///
    /// A zero `batch_size`, an unparsable RPC URL, and the zero `SystemConfig` address are
    /// each surfaced as distinct, human-readable `Config` errors. `transaction_type` is
    /// already range-checked at the CLI parsing boundary (a `u8` value out of `0..=255`
    /// never reaches this struct), so it has no corresponding check here.
    pub fn validate(&self) -> Result<(), IndexerErrorKind> {
        if self.optimism_l1_rpc.trim().is_empty() {
            return Err(IndexerError::Config("optimism_l1_rpc is required".into()).fatal());
        }
        if reqwest_url_is_invalid(&self.optimism_l1_rpc) {
            return Err(IndexerError::Config(format!(
                "optimism_l1_rpc is not a valid URL: {}",
                self.optimism_l1_rpc
            ))
            .fatal());
        }
        if self.optimism_l1_system_config.is_zero() {
            return Err(
                IndexerError::Config("optimism_l1_system_config must not be the zero address"
                    .into())
                .fatal(),
            );
        }
        if self.batch_size == 0 {
            return Err(IndexerError::Config("batch_size must be positive".into()).fatal());
        }
        Ok(())
    }
}

/// A dependency-free URL sanity check: requires a scheme and a non-empty authority.
///
/// The binary crate performs full parsing via `reqwest::Url` before constructing the
/// `AlloyL1Provider`; this check exists so `IndexerConfig::validate` has no dependency on
/// any one URL-parsing crate.
fn reqwest_url_is_invalid(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => scheme.is_empty() || rest.is_empty(),
        None => true,
    }
}
