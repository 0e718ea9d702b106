//! Content hashing using blake3.
//!
//! Asset digests are computed once at discovery time and persisted in the
//! cache map with an explicit algorithm tag (`blake3:<hex>`), so a future
//! change of algorithm simply invalidates every entry.

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Algorithm tag written in front of the hex digest.
    pub const ALGORITHM: &'static str = "blake3";

    /// Create a new ContentHash from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Tagged form stored in the cache map: `blake3:<hex>`.
    pub fn to_tagged(self) -> String {
        format!("{}:{}", Self::ALGORITHM, self.to_hex())
    }

    /// Parse the tagged form. Unknown algorithms yield `None`.
    pub fn from_tagged(s: &str) -> Option<Self> {
        let (algorithm, digest) = s.split_once(':')?;
        if algorithm != Self::ALGORITHM {
            return None;
        }
        Self::from_hex(digest)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Compute blake3 hash of an in-memory payload.
pub fn compute_bytes_hash(content: &[u8]) -> ContentHash {
    ContentHash::new(*blake3::hash(content).as_bytes())
}
