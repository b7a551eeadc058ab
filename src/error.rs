//! Error types for rag-backfill
//!
//! This module provides error handling for the whole crate, including:
//! - Domain-specific error types (Cursor, Database, Accelerator, Config)
//! - Conversions from the underlying sqlx/reqwest/io/serde errors
//! - Context information (cursor path, configuration key, container name)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rag-backfill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rag-backfill
///
/// Any variant reaching `main` terminates the run with a non-zero exit code.
/// Per-article ingestion failures are deliberately NOT represented here; they
/// are tallied in the run summary and the run continues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "DATABASE_URL")
        key: Option<String>,
    },

    /// Cursor checkpoint file error
    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Accelerator lifecycle error
    #[error("accelerator error: {0}")]
    Accelerator(#[from] AcceleratorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Cursor checkpoint file errors
#[derive(Debug, Error)]
pub enum CursorError {
    /// Cursor file exists but cannot be parsed
    ///
    /// Treating a corrupt file as empty would silently restart the backfill
    /// from the beginning, so this is fatal. The operator decides: fix the
    /// file, or run `reset-cursor` to start over.
    #[error(
        "cursor file {path} is corrupt ({reason}); fix it or run `backfill reset-cursor` to start over"
    )]
    Corrupt {
        /// Path of the unparsable cursor file
        path: PathBuf,
        /// Parse failure detail
        reason: String,
    },

    /// Cursor file could not be written
    #[error("failed to write cursor file {path}: {reason}")]
    WriteFailed {
        /// Path that could not be written
        path: PathBuf,
        /// Underlying I/O failure detail
        reason: String,
    },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Accelerator ("HyperBoost") lifecycle errors
///
/// Every variant is fatal for the run: a requested accelerator that cannot be
/// brought to Ready must stop the backfill before any article is read, rather
/// than silently falling back to the remote embedder.
#[derive(Debug, Error)]
pub enum AcceleratorError {
    /// Container runtime binary not found on PATH
    #[error("container runtime not found: {0}")]
    RuntimeMissing(String),

    /// Container failed to launch
    #[error("failed to start accelerator container {name}: {reason}")]
    StartFailed {
        /// Container name that failed to launch
        name: String,
        /// Launch failure detail
        reason: String,
    },

    /// Service did not become ready before the deadline
    #[error("accelerator at {endpoint} not ready after {waited_secs}s")]
    NotReady {
        /// Endpoint that was polled
        endpoint: String,
        /// Seconds spent polling before giving up
        waited_secs: u64,
    },

    /// Model download through the accelerator failed
    #[error("failed to pull model {model}: {reason}")]
    ModelPullFailed {
        /// Model name that failed to download
        model: String,
        /// Pull failure detail
        reason: String,
    },

    /// Operation attempted in the wrong lifecycle state
    #[error("cannot {operation} accelerator in state {state}")]
    InvalidState {
        /// The operation that was attempted (e.g., "pull model")
        operation: String,
        /// The current lifecycle state that prevents it
        state: String,
    },
}
