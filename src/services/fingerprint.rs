// src/services/fingerprint.rs

//! Content fingerprints for quotations.
//!
//! A fingerprint is the SHA-256 hex digest of `normalized_text|author`.
//! Text is lowercased, stripped of ASCII punctuation and whitespace-collapsed;
//! the author is used verbatim. No salt, so ids are stable across processes.

use sha2::{Digest, Sha256};

/// Normalize quotation text for fingerprinting.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the stable identity of a quotation.
pub fn fingerprint(text: &str, author: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    hasher.update(b"|");
    hasher.update(author.as_bytes());
    hex::encode(hasher.finalize())
}
