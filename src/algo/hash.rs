//! Deterministic hashing for skeleton signatures
//!
//! Provides cross-process deterministic hashing using blake3, so identical
//! fragment sequences always map to the same registry slot.

// =============================================================================
// StableHasher - Builder Pattern
// =============================================================================

/// A deterministic hasher using blake3
///
/// Unlike `std::hash::Hasher`, this produces the same output across
/// process restarts for the same input.
pub struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    /// Create a new StableHasher
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Update with raw bytes
    #[inline]
    pub fn update(mut self, data: &[u8]) -> Self {
        self.inner.update(data);
        self
    }

    /// Update with a string
    #[inline]
    pub fn update_str(self, s: &str) -> Self {
        self.update(s.as_bytes())
    }

    /// Update with a length-prefixed string
    ///
    /// `["ab", "c"]` and `["a", "bc"]` must not collide, so every fragment
    /// is framed by its byte length.
    #[inline]
    pub fn update_framed(self, s: &str) -> Self {
        self.update_usize(s.len()).update_str(s)
    }

    /// Update with a u64 value (little-endian)
    #[inline]
    pub fn update_u64(self, v: u64) -> Self {
        self.update(&v.to_le_bytes())
    }

    /// Update with a usize value (little-endian)
    #[inline]
    pub fn update_usize(self, v: usize) -> Self {
        self.update_u64(v as u64)
    }

    /// Finish and return the hash as u64
    ///
    /// Takes the first 8 bytes of blake3 output as little-endian u64.
    #[inline]
    pub fn finish(self) -> u64 {
        let hash = self.inner.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Signature of a fragment sequence.
pub fn fragment_signature<S: AsRef<str>>(fragments: &[S]) -> u64 {
    fragments
        .iter()
        .fold(
            StableHasher::new().update_usize(fragments.len()),
            |h, f| h.update_framed(f.as_ref()),
        )
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let a = fragment_signature(&["<p>", "</p>"]);
        let b = fragment_signature(&["<p>", "</p>"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_frames_fragments() {
        assert_ne!(fragment_signature(&["ab", "c"]), fragment_signature(&["a", "bc"]));
        assert_ne!(fragment_signature(&["a"]), fragment_signature(&["a", ""]));
    }
}
