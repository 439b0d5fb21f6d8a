//! Content fingerprints.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of a skill body. It is
//! the sole change-detection signal used by the sync job: timestamps and
//! content length are never consulted.

use sha2::{Digest, Sha256};

/// Compute the fingerprint of a skill body.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_single_byte_change_changes_fingerprint() {
        assert_ne!(fingerprint("Use the tool."), fingerprint("Use the tool!"));
        assert_eq!(fingerprint("same"), fingerprint("same"));
    }
}
