//! Content-addressed dedup keys.
//!
//! A [`Fingerprint`] is a SHA-256 digest of the normalized text, rendered
//! as lowercase hex. It depends on nothing but the text itself — not the
//! content type, not the metadata, and no call-time state — so the same
//! material re-uploaded (or reached via a different content type) maps to
//! the same key.

use sha2::{Digest, Sha256};

/// Deterministic digest of normalized text, used as the dedup store key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of (already normalized) text.
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
