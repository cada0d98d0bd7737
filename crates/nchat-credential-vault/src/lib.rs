//! # nchat-credential-vault
//!
//! Envelope-encrypted storage for integration credentials (API keys,
//! OAuth tokens, webhook signing secrets) backed by any
//! `nchat_secure_storage::SecureStorage` implementation.

#![warn(missing_docs)]

mod errors;
mod vault;

pub use errors::VaultError;
pub use vault::CredentialVault;
