//! The two operating modes of the indexer's ingestion state machine.

use core::fmt;

/// The operating mode of the deposit indexer worker.
///
/// The worker is at all times in exactly one of these two modes. `catch_up` pulls
/// bounded windows of historical logs up to the L1 safe head; `realtime` polls an
/// installed log filter for new deposits as they land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Pulling bounded `[from, to]` log windows up to the L1 safe head.
    CatchUp,
    /// Polling an installed L1 log filter for newly confirmed deposits.
    Realtime,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatchUp => write!(f, "catch_up"),
            Self::Realtime => write!(f, "realtime"),
        }
    }
}
