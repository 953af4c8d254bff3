use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Validates cached template bytes using SHA-256 checksums
///
/// Downloaded templates sit in the in-memory cache for up to an hour and are
/// written into every document filled from them, so a corrupted entry would
/// silently poison every fill until it expires. Each entry therefore carries
/// a checksum computed at insert time and re-verified on every retrieval;
/// a mismatch forces a fresh download.

/// One cached template with its integrity checksum.
#[derive(Debug, Clone)]
pub struct CachedTemplate {
    /// Raw PDF bytes, shared with in-flight fill operations.
    pub bytes: Arc<Vec<u8>>,
    /// SHA-256 checksum of the bytes (hex encoded).
    pub checksum: String,
}

impl CachedTemplate {
    /// Creates a cache entry with a freshly computed checksum.
    pub fn new(bytes: Arc<Vec<u8>>) -> Self {
        let checksum = Self::compute_checksum(&bytes);
        Self { bytes, checksum }
    }

    /// Computes the SHA-256 checksum of a byte buffer.
    pub fn compute_checksum(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Validates the integrity of the cached bytes.
    ///
    /// Returns true if the checksum matches, false if corrupted.
    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.bytes) == self.checksum
    }

    /// Returns the bytes if the entry still validates, None otherwise.
    pub fn validated_bytes(&self) -> Option<Arc<Vec<u8>>> {
        if self.is_valid() {
            Some(Arc::clone(&self.bytes))
        } else {
            tracing::warn!(
                "Template cache validation failed: checksum mismatch. Expected: {}, byte length: {}",
                self.checksum,
                self.bytes.len()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_entry_validation() {
        let bytes = Arc::new(b"%PDF-1.5 fake template".to_vec());
        let entry = CachedTemplate::new(Arc::clone(&bytes));

        assert!(entry.is_valid());
        assert_eq!(entry.validated_bytes(), Some(bytes));
    }

    #[test]
    fn test_tampered_bytes_rejected() {
        let entry = CachedTemplate::new(Arc::new(b"original bytes".to_vec()));

        let mut tampered = entry;
        tampered.bytes = Arc::new(b"tampered bytes".to_vec());

        assert!(!tampered.is_valid());
        assert!(tampered.validated_bytes().is_none());
    }

    #[test]
    fn test_checksum_consistency() {
        let entry1 = CachedTemplate::new(Arc::new(b"same content".to_vec()));
        let entry2 = CachedTemplate::new(Arc::new(b"same content".to_vec()));

        assert_eq!(entry1.checksum, entry2.checksum);
    }
}
