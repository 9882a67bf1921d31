//! Hashing helpers used to keep push tokens out of logs.

use sha2::{Digest, Sha256};

/// Number of hex characters kept in a token fingerprint.
const FINGERPRINT_LEN: usize = 12;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short, stable identifier for a push token.
///
/// Push tokens are bearer credentials for a client device, so logs and
/// API responses carry this fingerprint instead of the raw value.
pub fn token_fingerprint(token: &str) -> String {
    let mut digest = sha256_hex(token);
    digest.truncate(FINGERPRINT_LEN);
    digest
}
