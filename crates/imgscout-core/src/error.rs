//! Error types for the imgscout pipeline.
//!
//! Errors are organized by concern. Only [`TableError`] and [`ConfigError`]
//! are ever fatal to a run; [`PipelineError`] is produced per provider or per
//! upload and is logged and swallowed by the orchestrator.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for imgscout operations.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline stage errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Input/output table errors
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A credential required by a provider or host is not set
    #[error("Missing credential for {service}: {hint}")]
    MissingCredential { service: String, hint: String },
}

/// Errors raised while querying, fetching, validating or uploading one image.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Transport failure or non-success HTTP status
    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
    },

    /// Response did not have the expected shape
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Downloaded content is not a usable image
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Upload backend rejected the file or kept failing
    #[error("Upload error: {message}")]
    Upload {
        message: String,
        status_code: Option<u16>,
    },

    /// Provider or backend is missing required configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Operation exceeded its deadline
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

impl PipelineError {
    /// Build a network error from a reqwest failure, keeping the status if any.
    pub fn network(context: &str, err: reqwest::Error) -> Self {
        PipelineError::Network {
            message: format!("{context}: {err}"),
            status_code: err.status().map(|s| s.as_u16()),
        }
    }

    /// Build a network error for a non-success HTTP status.
    pub fn status(context: &str, status: reqwest::StatusCode) -> Self {
        PipelineError::Network {
            message: format!("{context} HTTP {status}"),
            status_code: Some(status.as_u16()),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        PipelineError::Parse {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation {
            message: message.into(),
        }
    }

    /// HTTP status code carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PipelineError::Network { status_code, .. }
            | PipelineError::Upload { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Errors reading or writing the product table. These abort the run.
#[derive(Error, Debug)]
pub enum TableError {
    /// The input file could not be opened or parsed
    #[error("Failed to read table {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// The output file could not be written
    #[error("Failed to write table {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// A required column is absent
    #[error("Column not found: {column} (available: {available})")]
    MissingColumn { column: String, available: String },

    /// Attempt to write into the protected source-image column
    #[error("Column {0} is protected and cannot be overwritten")]
    ProtectedColumn(String),
}

/// Convenience type alias for imgscout results.
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Convenience type alias for pipeline-stage results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
