//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed: tag mismatch or malformed input. Never yields partial plaintext.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes.
        expected: usize,
        /// Actual key length in bytes.
        actual: usize,
    },

    /// Invalid nonce/IV length.
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected nonce length in bytes.
        expected: usize,
        /// Actual nonce length in bytes.
        actual: usize,
    },

    /// Requested HKDF output length exceeds RFC 5869's `255 * HashLen` bound.
    #[error("invalid derived key length: {0} exceeds 255*32 bytes")]
    InvalidLength(usize),

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Peer's ECDH public key is malformed or not on the curve.
    #[error("invalid peer key")]
    InvalidPeerKey,

    /// Public key bytes do not decode to a valid curve point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Private key bytes are out of range for the curve's scalar field.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Signature bytes are malformed.
    #[error("invalid signature")]
    InvalidSignature,

    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),
}
