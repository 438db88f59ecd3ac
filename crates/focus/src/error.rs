//! Error types for the blocking coordinator and its stores

use thiserror::Error;

/// Blocker-specific errors
#[derive(Error, Debug)]
pub enum BlockerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State store unavailable: {0}")]
    StateStore(String),

    #[error("Rule store rejected update: {0}")]
    RuleStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BlockerError>;
