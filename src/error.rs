//! Error types for the relay and its pipeline (thiserror-based).

use thiserror::Error;

/// Errors reported by the relay and the pipeline around it.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Frame allocation failed for the {slot} slot")]
    Allocation { slot: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, RelayError>;
