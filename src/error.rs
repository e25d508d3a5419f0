use std::io;
use thiserror::Error;

/// Custom error type for the workpulse application
#[derive(Error, Debug)]
pub enum WorkpulseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Sample collection failed: {0}")]
    Sample(String),

    #[error("Idle detection unavailable: {0}")]
    IdleUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the workpulse application
pub type Result<T> = std::result::Result<T, WorkpulseError>;

impl WorkpulseError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        WorkpulseError::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        WorkpulseError::InvalidInput(msg.into())
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern<S: Into<String>, R: Into<String>>(pattern: S, reason: R) -> Self {
        WorkpulseError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a sample collection error
    pub fn sample<S: Into<String>>(msg: S) -> Self {
        WorkpulseError::Sample(msg.into())
    }

    pub fn idle_unavailable<S: Into<String>>(msg: S) -> Self {
        WorkpulseError::IdleUnavailable(msg.into())
    }

    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        WorkpulseError::Persistence(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        WorkpulseError::Other(msg.into())
    }
}
