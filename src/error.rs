use thiserror::Error;

/// Anchor tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tracker worker has stopped")]
    WorkerStopped,

    #[error("Tracker worker panicked")]
    WorkerPanicked,
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
