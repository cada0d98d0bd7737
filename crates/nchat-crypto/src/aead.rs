//! # AES-256-GCM authenticated encryption
//!
//! ## Security properties
//!
//! - 96-bit random IV per call, 128-bit authentication tag
//! - Decryption never returns partial output on tag mismatch
//! - Absent AAD is encoded as zero-length AAD for the AEAD call (spec.md §4.1)

use crate::CryptoError;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use zeroize::Zeroize;

/// 256-bit AES key.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Wrap 32 raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random key from the CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// 96-bit GCM nonce/IV.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Iv([u8; 12]);

impl Iv {
    /// Wrap 12 raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Generate a random IV.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Raw IV bytes.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Encrypt `plaintext` with AES-256-GCM. Returns `(ciphertext || tag, iv)`.
/// `aad` defaults to an empty slice when absent.
pub fn aes_gcm_encrypt(
    key: &SecretKey,
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<(Vec<u8>, Iv), CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let iv = Iv::generate();

    let ciphertext = cipher
        .encrypt(
            AesNonce::from_slice(iv.as_bytes()),
            Payload {
                msg: plaintext,
                aad: aad.unwrap_or(&[]),
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok((ciphertext, iv))
}

/// Decrypt `ciphertext` (which carries the appended tag). Fails with
/// [`CryptoError::DecryptionFailed`] on tag mismatch or malformed input —
/// never returns partial plaintext.
pub fn aes_gcm_decrypt(
    key: &SecretKey,
    ciphertext: &[u8],
    iv: &Iv,
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    cipher
        .decrypt(
            AesNonce::from_slice(iv.as_bytes()),
            Payload {
                msg: ciphertext,
                aad: aad.unwrap_or(&[]),
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
