use sha1::{Digest, Sha1};

/// Signature the platform attaches to its handshake: the lowercase hex SHA1 of
/// the lexicographically sorted, concatenated `(token, timestamp, nonce)`.
pub fn compute_signature(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();

    let mut sha = Sha1::new();
    sha.update(parts.concat());
    hex::encode(sha.finalize())
}

pub fn check_signature(token: &str, signature: &str, timestamp: &str, nonce: &str) -> bool {
    compute_signature(token, timestamp, nonce) == signature
}
