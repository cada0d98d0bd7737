//! # SHA-256 / SHA-512 hashing

use sha2::{Digest, Sha256, Sha512};

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-512 digest of `data`.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    Sha512::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256(b"nchat"), sha256(b"nchat"));
    }

    #[test]
    fn sha256_distinguishes_inputs() {
        assert_ne!(sha256(b"a"), sha256(b"b"));
    }

    #[test]
    fn sha512_is_deterministic() {
        assert_eq!(sha512(b"nchat"), sha512(b"nchat"));
    }

    #[test]
    fn empty_input_is_well_defined() {
        // Known SHA-256("") first byte.
        assert_eq!(sha256(b"")[0], 0xe3);
    }
}
