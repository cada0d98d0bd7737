//! An in-memory [`SecureStorage`] implementation for tests and local
//! development. Nothing here is persisted or encrypted — never point this
//! at real secrets outside tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::StorageError;
use crate::port::SecureStorage;

/// `SecureStorage` backed by a `HashMap` guarded by a `tokio::sync::RwLock`.
#[derive(Default)]
pub struct InMemorySecureStorage {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySecureStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    Ok(())
}

#[async_trait]
impl SecureStorage for InMemorySecureStorage {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
