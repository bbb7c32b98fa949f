//! Error types for report generation
//!
//! Stage-level and configuration failures abort the whole run; everything
//! scoped to a single card is reported and the card is skipped.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a residency report
#[derive(Error, Debug)]
pub enum TrimmerError {
    #[error("Unknown list '{stage}', probably due to bad configuration (check the configuration file)")]
    StageNotFound { stage: String },

    #[error("List '{stage}' could not be fetched: {reason}")]
    StageUnavailable { stage: String, reason: String },

    #[error("Access denied to {resource}, check API_KEY and API_TOKEN")]
    AccessDenied { resource: String },

    #[error("Malformed card id '{id}': {reason}")]
    MalformedIdentifier { id: String, reason: String },

    #[error("Request for {resource} failed: {reason}")]
    Http { resource: String, reason: String },

    #[error("Unexpected response for {resource}: {reason}")]
    Decode { resource: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {origin}: {source}")]
    ConfigParse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrimmerError {
    /// Whether this error must abort the entire run.
    ///
    /// Only errors scoped to a single card (its history fetch or its id)
    /// are recoverable. List failures of any kind are reported as
    /// [`TrimmerError::StageUnavailable`] or [`TrimmerError::StageNotFound`].
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TrimmerError::MalformedIdentifier { .. }
                | TrimmerError::Http { .. }
                | TrimmerError::Decode { .. }
        )
    }
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, TrimmerError>;
