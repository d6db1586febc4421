//! SHA-256 digests used for certificate verification hashes and password hashes.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 over the concatenation of `parts`.
pub fn sha256_hex_parts(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    sha256_hex_parts(&[bytes])
}
