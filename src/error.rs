//! Error types for TNRA
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using TnraError
pub type Result<T> = std::result::Result<T, TnraError>;

/// Unified error type for TNRA operations
#[derive(Debug, Error)]
pub enum TnraError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    /// A persisted file (queue dump, variable store) did not have the expected shape
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("No output file is open")]
    SinkNotOpen,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No response arrived within the client's window
    #[error("Timed out after {0:?} waiting for a response")]
    Timeout(Duration),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Worker Errors
    // -------------------------------------------------------------------------
    #[error("Routing error: {0}")]
    Routing(String),
}

impl From<bincode::Error> for TnraError {
    fn from(err: bincode::Error) -> Self {
        TnraError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for TnraError {
    fn from(err: serde_json::Error) -> Self {
        TnraError::Serialization(err.to_string())
    }
}
