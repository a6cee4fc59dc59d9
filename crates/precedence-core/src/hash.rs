use sha2::{Digest, Sha256};

/// Computes SHA-256 and returns the lowercase hex digest.
///
/// Used both for the record id (over the raw value bytes) and for the
/// `hash` query parameter (over the canonical `data` bytes).
pub fn sha256_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}
