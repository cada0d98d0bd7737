//! Error types for the credential vault.

use nchat_crypto::CryptoError;
use nchat_secure_storage::StorageError;
use thiserror::Error;

/// Errors raised while storing or retrieving a credential.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The underlying storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Encryption or decryption of the envelope failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A stored envelope was encrypted but the vault holds no encryption
    /// key to decrypt it.
    #[error("credential is encrypted but no vault key is configured")]
    KeyRequired,

    /// A stored envelope had an unrecognized or truncated layout.
    #[error("malformed credential envelope")]
    MalformedEnvelope,

    /// The credential payload failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
