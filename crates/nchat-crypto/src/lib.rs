//! # nchat-crypto — End-to-end cryptographic primitives
//!
//! Pure functions over byte sequences: nothing here does I/O, and nothing
//! mutates its inputs. Random bytes always come from the OS CSPRNG.
//!
//! ## Components
//!
//! | Module | Algorithm | Use case |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1 (`k256`) | Key pairs, signing, fingerprints |
//! | `ecdh`  | secp256k1 (`k256`) | Shared-secret agreement |
//! | `kdf`   | HKDF-SHA256 (RFC 5869) | Root/chain key derivation |
//! | `aead`  | AES-256-GCM | Authenticated encryption |
//! | `mac`   | HMAC-SHA256 | Message authentication |
//! | `hash`  | SHA-256 / SHA-512 | Generic hashing |
//!
//! ## Invariants
//!
//! - Private key material is zeroized on drop.
//! - Keys are never logged.
//! - `aes_gcm_decrypt` never returns partial plaintext on a tag mismatch.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aead;
pub mod ecdh;
pub mod ecdsa;
pub mod errors;
pub mod hash;
pub mod kdf;
pub mod mac;

pub use aead::{aes_gcm_decrypt, aes_gcm_encrypt, Iv, SecretKey};
pub use ecdh::{agree, SharedSecret};
pub use ecdsa::{
    generate_kem_keypair, generate_sig_keypair, Fingerprint, KeyPair, PublicKey, Signature,
};
pub use errors::CryptoError;
pub use hash::{sha256, sha512};
pub use kdf::{derive_root_and_chain, hkdf, DerivedKeys};
pub use mac::{hmac_sha256, verify_hmac};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
