//! # Key pairs, ECDSA signatures, and fingerprints (secp256k1)
//!
//! One `KeyPair` type backs both the KEM role (ECDH agreement, see
//! [`crate::ecdh`]) and the signature role (ECDSA). Callers pick which role
//! they need via [`generate_kem_keypair`] / [`generate_sig_keypair`] — both
//! simply generate a fresh random scalar, kept as two entry points so call
//! sites read as intent rather than mechanism.
//!
//! ## Security properties
//!
//! - RFC 6979 deterministic nonces for signing (no RNG dependency)
//! - Low-S normalization (EIP-2)
//! - Private key material is zeroized on drop

use crate::CryptoError;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature as K256Signature, SigningKey, VerifyingKey,
};
use k256::SecretKey;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Uncompressed secp256k1 point: `0x04 || X || Y`, 65 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey([u8; 65]);

impl PublicKey {
    /// Parse from a raw uncompressed SEC1 point.
    pub fn from_bytes(bytes: [u8; 65]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Raw uncompressed SEC1 bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Verify an ECDSA signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig =
            K256Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// SHA-256 fingerprint of the public key (spec.md §3/§4.1).
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        Fingerprint(hasher.finalize().into())
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Wrap raw r||s bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Raw r||s bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// SHA-256 hash of a public key, rendered for human verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Uppercase hex, grouped into 4-character chunks separated by a space.
    pub fn format(&self) -> String {
        let hex = self
            .0
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<String>();
        hex.as_bytes()
            .chunks(4)
            .map(|c| std::str::from_utf8(c).expect("hex is ascii"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// secp256k1 key pair usable for ECDH agreement or ECDSA signing.
pub struct KeyPair {
    pub(crate) secret: SecretKey,
}

impl KeyPair {
    /// Generate a random key pair for ECDH agreement.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut rand::thread_rng()),
        }
    }

    /// Construct from a raw 32-byte scalar.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let secret =
            SecretKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { secret })
    }

    /// Uncompressed public key (65 bytes).
    pub fn public_key(&self) -> PublicKey {
        let point = self.secret.public_key().to_encoded_point(false);
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(point.as_bytes());
        PublicKey(bytes)
    }

    /// Sign a message (deterministic, RFC 6979).
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signing_key = SigningKey::from(&self.secret);
        let sig: K256Signature = signing_key.sign(message);
        Signature(sig.to_bytes().into())
    }

    /// Raw scalar bytes, for caller-controlled envelope storage only.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes().into()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.secret.to_bytes().into();
        bytes.zeroize();
    }
}

/// Generate a key pair for ECDH agreement (session establishment).
pub fn generate_kem_keypair() -> KeyPair {
    KeyPair::generate()
}

/// Generate a key pair for ECDSA signing (identity / message signing).
pub fn generate_sig_keypair() -> KeyPair {
    KeyPair::generate()
}
