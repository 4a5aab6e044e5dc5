/// Refresh Token Hashing
///
/// Only the SHA-256 digest of a refresh token reaches storage, so a leaked
/// `refresh_tokens` table does not hand out usable credentials.

use sha2::{Digest, Sha256};

/// Hash a raw refresh token to lowercase hex SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
