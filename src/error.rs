//! Error types for the lip-sync core.

/// Top-level error type for viseme scheduling and avatar animation.
#[derive(Debug, thiserror::Error)]
pub enum LipSyncError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A viseme event list that breaks the ordering contract.
    #[error("invalid viseme track at event {index}: {reason}")]
    Track {
        /// Position of the offending event.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Malformed chat backend reply or request.
    #[error("reply error: {0}")]
    Reply(String),

    /// Avatar catalog or binding error.
    #[error("avatar error: {0}")]
    Avatar(String),

    /// Audio file inspection error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Scheduler or frame-loop error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LipSyncError>;
