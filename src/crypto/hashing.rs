// Strong entity tags for response bodies.

use sha2::{Digest, Sha256};

/// Quoted SHA-256 hex digest of `body`, usable as a strong `ETag`.
pub fn etag(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("\"{}\"", hex::encode(digest))
}

/// Whether an `If-None-Match` header value matches `etag`.
///
/// Accepts `*`, comma-separated lists and weak tags (`W/"..."`), which
/// compare weakly as allowed for `GET`.
pub fn if_none_match(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/") == etag
    })
}
