//! Envelope-encrypted credential storage.
//!
//! Credentials (API keys, OAuth tokens, webhook secrets) are JSON values
//! that get AES-256-GCM sealed before being handed to a
//! [`SecureStorage`] backend, when the vault is constructed with an
//! encryption key. Without a key, credentials pass through unencrypted —
//! intended for local development against [`nchat_secure_storage::InMemorySecureStorage`],
//! never for production.

use std::sync::Arc;

use nchat_crypto::aead::{aes_gcm_decrypt, aes_gcm_encrypt, Iv, SecretKey};
use nchat_secure_storage::SecureStorage;
use nchat_types::InstallationId;
use serde_json::Value;

use crate::errors::VaultError;

const ENCRYPTED_MARKER: u8 = 0x01;
const PLAINTEXT_MARKER: u8 = 0x00;
const IV_LEN: usize = 12;
const KEY_PREFIX: &str = "credential-vault/";

fn storage_key(installation_id: InstallationId) -> String {
    format!("{KEY_PREFIX}{installation_id}")
}

/// Stores and retrieves per-installation credential payloads.
pub struct CredentialVault {
    storage: Arc<dyn SecureStorage>,
    encryption_key: Option<SecretKey>,
}

impl CredentialVault {
    /// Build a vault that envelope-encrypts every credential with `key`.
    pub fn with_encryption(storage: Arc<dyn SecureStorage>, key: SecretKey) -> Self {
        Self {
            storage,
            encryption_key: Some(key),
        }
    }

    /// Build a vault with no encryption — credentials are stored as
    /// plaintext JSON. Intended for local development only.
    pub fn passthrough(storage: Arc<dyn SecureStorage>) -> Self {
        Self {
            storage,
            encryption_key: None,
        }
    }

    /// Seal and store `credential` for `installation_id`, replacing any
    /// existing value.
    pub async fn store_credential(
        &self,
        installation_id: InstallationId,
        credential: &Value,
    ) -> Result<(), VaultError> {
        let plaintext = serde_json::to_vec(credential)?;
        let aad = installation_id.to_string();

        let envelope = match &self.encryption_key {
            Some(key) => {
                let (ciphertext, iv) = aes_gcm_encrypt(key, &plaintext, Some(aad.as_bytes()))?;
                let mut bytes = Vec::with_capacity(1 + IV_LEN + ciphertext.len());
                bytes.push(ENCRYPTED_MARKER);
                bytes.extend_from_slice(iv.as_bytes());
                bytes.extend_from_slice(&ciphertext);
                bytes
            }
            None => {
                let mut bytes = Vec::with_capacity(1 + plaintext.len());
                bytes.push(PLAINTEXT_MARKER);
                bytes.extend_from_slice(&plaintext);
                bytes
            }
        };

        self.storage
            .put(&storage_key(installation_id), envelope)
            .await?;
        Ok(())
    }

    /// Retrieve and unseal the credential stored for `installation_id`.
    pub async fn get_credential(
        &self,
        installation_id: InstallationId,
    ) -> Result<Value, VaultError> {
        let envelope = self.storage.get(&storage_key(installation_id)).await?;
        let (marker, rest) = envelope.split_first().ok_or(VaultError::MalformedEnvelope)?;

        let plaintext = match *marker {
            PLAINTEXT_MARKER => rest.to_vec(),
            ENCRYPTED_MARKER => {
                let key = self.encryption_key.as_ref().ok_or(VaultError::KeyRequired)?;
                if rest.len() < IV_LEN {
                    return Err(VaultError::MalformedEnvelope);
                }
                let (iv_bytes, ciphertext) = rest.split_at(IV_LEN);
                let mut iv_arr = [0u8; IV_LEN];
                iv_arr.copy_from_slice(iv_bytes);
                let iv = Iv::from_bytes(iv_arr);
                let aad = installation_id.to_string();
                aes_gcm_decrypt(key, ciphertext, &iv, Some(aad.as_bytes()))?
            }
            _ => return Err(VaultError::MalformedEnvelope),
        };

        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Remove the credential stored for `installation_id`, if any.
    pub async fn delete_credential(
        &self,
        installation_id: InstallationId,
    ) -> Result<(), VaultError> {
        self.storage
            .delete(&storage_key(installation_id))
            .await?;
        Ok(())
    }

    /// Whether a credential is currently stored for `installation_id`.
    pub async fn has(&self, installation_id: InstallationId) -> Result<bool, VaultError> {
        Ok(self
            .storage
            .list_keys(&storage_key(installation_id))
            .await?
            .iter()
            .any(|k| k == &storage_key(installation_id)))
    }

    /// Every installation id with a credential currently stored.
    pub async fn list_ids(&self) -> Result<Vec<InstallationId>, VaultError> {
        Ok(self
            .storage
            .list_keys(KEY_PREFIX)
            .await?
            .iter()
            .filter_map(|k| k.strip_prefix(KEY_PREFIX))
            .filter_map(|id| uuid::Uuid::parse_str(id).ok())
            .map(InstallationId::from_uuid)
            .collect())
    }

    /// Remove every credential currently stored, emptying the vault.
    pub async fn clear(&self) -> Result<(), VaultError> {
        for id in self.list_ids().await? {
            self.delete_credential(id).await?;
        }
        Ok(())
    }
}
