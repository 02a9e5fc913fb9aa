use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wake lock error: {0}")]
    WakeLock(#[from] WakeLockError),

    #[error("{0}")]
    Other(String),
}

/// Wake lock failures
///
/// Kept cloneable so the last failure can be held as observable state
/// for the UI while the original is logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WakeLockError {
    /// No native capability and no fallback; the screen may sleep
    #[error("wake lock is not supported on this system")]
    Unsupported,

    /// First acquire of a session failed; scrolling must not begin
    #[error("failed to acquire wake lock: {0}")]
    AcquireFailed(String),

    /// Re-acquire after the platform dropped the lock failed
    #[error("failed to re-acquire wake lock: {0}")]
    ReacquireFailed(String),
}

impl WakeLockError {
    /// Whether this failure must prevent a session from starting
    pub fn is_fatal(&self) -> bool {
        matches!(self, WakeLockError::AcquireFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
