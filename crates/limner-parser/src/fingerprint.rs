//! Content fingerprints for optimistic concurrency
//!
//! A fingerprint is captured when a note is read and compared again right
//! before the note is written. It only has to detect that *something* changed,
//! so a truncated BLAKE3 digest is plenty.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fingerprint of the empty string.
pub const EMPTY_FINGERPRINT: &str = "0";

/// Number of digest bytes kept (rendered as twice as many hex characters).
const FINGERPRINT_BYTES: usize = 8;

/// Deterministic digest of a note's full text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of `text`
    pub fn of(text: &str) -> Self {
        if text.is_empty() {
            return Self(EMPTY_FINGERPRINT.to_string());
        }

        let digest = blake3::hash(text.as_bytes());
        Self(hex::encode(&digest.as_bytes()[..FINGERPRINT_BYTES]))
    }

    /// Hex rendering
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `text` still hashes to this fingerprint
    pub fn matches(&self, text: &str) -> bool {
        *self == Self::of(text)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of `text`
pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint::of(text)
}
