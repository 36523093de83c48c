//! Error handling and custom error types
//!
//! Provides unified error handling across the analyzer using thiserror.

use crate::models::BackendId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or malformed image reference. Never retried.
    #[error("Input error: {0}")]
    Input(String),

    #[error("Image classification failed: {0}")]
    Classification(String),

    #[error("Evidence path failed: {0}")]
    PathExecution(String),

    #[error("All analyzer backends failed ({attempted:?}): {last_error}")]
    AllBackendsFailed {
        attempted: Vec<BackendId>,
        last_error: String,
    },

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Priors store error: {0}")]
    PriorsStore(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True only for a caller-side deadline.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
