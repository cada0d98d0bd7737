//! Error types for the secure storage port.

use thiserror::Error;

/// Errors returned by a [`crate::SecureStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No value exists under the given key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The backend itself failed (I/O, connection, serialization).
    #[error("backend error: {0}")]
    Backend(String),

    /// The key was malformed (empty, too long, disallowed characters).
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
