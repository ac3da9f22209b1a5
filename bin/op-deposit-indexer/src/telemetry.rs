//! Structured logging setup.

use anyhow::{anyhow, Result};
use tracing::Level;

/// Installs a global `tracing` subscriber at the verbosity implied by `v` (0-4), mirroring
/// the host binary's `-v` flag convention.
pub fn init_tracing_subscriber(v: u8) -> Result<()> {
    let level = match v {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}
