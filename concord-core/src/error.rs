//! Error types for the concord-core crate.
//!
//! Metrics never fail: a metric whose preconditions are not met returns
//! `None`. The variants here cover the fatal cases only, i.e. an export that
//! cannot be read or does not have the expected shape, and broken
//! configuration.

use thiserror::Error;

/// Top-level error type for agreement computation and report generation.
#[derive(Debug, Error)]
pub enum ConcordError {
    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ConcordError {
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConcordError>;
