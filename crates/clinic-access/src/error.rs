//! Error types for storage and configuration
//!
//! Permission queries never surface these: the stores log them and fall back
//! to their documented defaults. They are returned by the raw
//! [`KeyValueStore`](crate::store::KeyValueStore) seam and by configuration
//! validation.

use thiserror::Error;

/// Key-value storage error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend refused the operation (quota, read-only, disconnected)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Get error code for logs and diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Io(_) => "STORE_IO",
            StoreError::Serialization(_) => "STORE_SERIALIZATION",
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },

    /// Two storage keys point at the same slot.
    #[error("Storage key {0:?} is used for more than one value")]
    DuplicateKey(String),
}
