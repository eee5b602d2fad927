//! Secret hashing for API tokens.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash a secret (API token) for storage and lookup. Salted with a fixed
/// domain prefix so hashes aren't reusable across systems.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"course-purchases-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new bearer token (`cp_` + 64 hex chars).
pub fn generate_api_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("cp_{}", hex::encode(bytes))
}
