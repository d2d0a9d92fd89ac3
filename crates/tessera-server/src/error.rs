//! Error types for the Tessera node.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur serving requests.
///
/// None of these are fatal to the process; every failure is scoped to
/// the single request or round that raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// Durable storage error
    #[error("Storage error: {0}")]
    Storage(#[from] tessera_store::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Access denied
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
