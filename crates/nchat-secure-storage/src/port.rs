//! The storage-agnostic port the credential vault is built against.
//!
//! A real deployment implements [`SecureStorage`] against whatever at-rest
//! store it trusts — a KMS-backed database, an encrypted file, a secrets
//! manager. This crate never assumes a particular backend; it only defines
//! the contract and ships an in-memory implementation for tests.

use async_trait::async_trait;

use crate::errors::StorageError;

/// A byte-oriented key/value store for secret material.
///
/// Implementations are responsible for whatever at-rest protection their
/// backend provides; this trait makes no claims about encryption — that is
/// the job of the caller (see `nchat-credential-vault`, which envelope-
/// encrypts values before they ever reach a `SecureStorage`).
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Store `value` under `key`, replacing any existing value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the value stored under `key`. Succeeds even if absent.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List every key currently stored under `prefix`.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
