//! Digest helpers: SHA-256 for block hashes and MD5 for book record ids.

use md5::Md5;
use sha2::{Digest, Sha256};

/// Hash inputs (concatenate as bytes, SHA-256) and return lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// Derive the 32-char hex id of a book record from an identifier code and a date.
///
/// Not collision resistant; only used to label metadata, never for the chain.
pub fn record_id(code: &str, date: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(code.as_bytes());
    hasher.update(date.as_bytes());
    hex::encode(hasher.finalize())
}
