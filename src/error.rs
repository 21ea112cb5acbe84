//! Error types recorded on progress bars and returned from reporting calls.

use compact_str::CompactString;
use thiserror::Error;

/// Errors produced while tracking a [`Bar`](crate::Bar).
///
/// `OutOfRange` and `ForceStopped` are never returned from a reporting call;
/// they are recorded on the bar and travel with its snapshots. Only
/// `Disconnected` is handed back to the caller.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgressError {
    /// Cumulative progress went past the declared total.
    #[error("Out of range: {current} exceeds total {max}")]
    OutOfRange {
        /// Position after the overshooting advance.
        current: u64,
        /// Declared total.
        max: u64,
    },

    /// The owner aborted the bar.
    #[error("Force stopped: {reason}")]
    ForceStopped {
        /// Cause supplied by the owner.
        reason: CompactString,
    },

    /// The manager has stopped consuming reports and closed its channel.
    #[error("Progress channel closed")]
    Disconnected,
}
