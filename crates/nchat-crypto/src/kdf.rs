//! # RFC 5869 HKDF-SHA256 key derivation

use crate::CryptoError;
use hkdf::Hkdf;
use sha2::Sha256;

/// Maximum HKDF output length for SHA-256 (`255 * HashLen`).
pub const MAX_OUTPUT_LEN: usize = 255 * 32;

/// `(rootKey, chainKey)` pair yielded by [`derive_root_and_chain`].
pub type DerivedKeys = ([u8; 32], [u8; 32]);

/// Domain separator for root/chain key derivation. Exact bytes must stay
/// stable across versions since they are part of the derivation input.
const ROOT_KEY_INFO: &[u8] = b"NCHAT_ROOT_KEY";

/// RFC 5869 HKDF-Extract-then-Expand over SHA-256.
///
/// `l` must be at most [`MAX_OUTPUT_LEN`].
pub fn hkdf(ikm: &[u8], salt: &[u8], info: &[u8], l: usize) -> Result<Vec<u8>, CryptoError> {
    if l > MAX_OUTPUT_LEN {
        return Err(CryptoError::InvalidLength(l));
    }
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut out = vec![0u8; l];
    hk.expand(info, &mut out)
        .map_err(|_| CryptoError::InvalidLength(l))?;
    Ok(out)
}

/// Derive a 32-byte root key and a 32-byte chain key from an ECDH shared
/// secret, per spec.md §4.1.
pub fn derive_root_and_chain(shared: &[u8; 32]) -> Result<DerivedKeys, CryptoError> {
    let salt = [0u8; 32];
    let out = hkdf(shared, &salt, ROOT_KEY_INFO, 64)?;
    let mut root = [0u8; 32];
    let mut chain = [0u8; 32];
    root.copy_from_slice(&out[..32]);
    chain.copy_from_slice(&out[32..]);
    Ok((root, chain))
}
