//! SHA-256 helpers for identifiers that must never leave the relay in
//! plaintext (email, phone, IP).

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the trimmed, lower-cased value.
pub fn sha256_normalized(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// True for a 64-character lower-case hex string, i.e. something that is
/// already a SHA-256 digest.
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Keep digests as they are, hash anything else.
pub fn ensure_hashed(value: &str) -> String {
    let trimmed = value.trim();
    if is_sha256_hex(trimmed) {
        trimmed.to_string()
    } else {
        sha256_normalized(trimmed)
    }
}
