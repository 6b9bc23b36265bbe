//! Content fingerprints using BLAKE3
//!
//! The build orchestrator compares fingerprints of rendered HTML between
//! builds to skip writing unchanged outputs.
//!
//! # Algorithm
//!
//! 1. Hash the rendered bytes with BLAKE3
//! 2. Take the first 128 bits (16 bytes) of the hash
//! 3. Encode as lowercase hexadecimal
//!
//! # Example
//!
//! ```
//! use markdown_ingest::fingerprint::ContentFingerprint;
//!
//! let html = b"<h1>Hello World</h1>\n";
//! let fingerprint = ContentFingerprint::generate(html);
//! assert_eq!(fingerprint.len(), 32);
//! assert_eq!(fingerprint, ContentFingerprint::generate(html));
//! ```

/// Number of hash bytes kept in a fingerprint
const FINGERPRINT_BYTES: usize = 16;

/// BLAKE3 content fingerprint
pub struct ContentFingerprint;

impl ContentFingerprint {
    /// Fingerprint a byte buffer as 32 lowercase hex characters
    pub fn generate(content: &[u8]) -> String {
        let hash = blake3::hash(content);
        hex::encode(&hash.as_bytes()[..FINGERPRINT_BYTES])
    }

    /// Fingerprint content fed in pieces
    ///
    /// Produces the same value as [`ContentFingerprint::generate`] over the
    /// concatenated pieces.
    pub fn incremental() -> IncrementalFingerprint {
        IncrementalFingerprint {
            hasher: blake3::Hasher::new(),
        }
    }
}

/// Fingerprint builder for streamed output
pub struct IncrementalFingerprint {
    hasher: blake3::Hasher,
}

impl IncrementalFingerprint {
    pub fn update(&mut self, content: &[u8]) {
        self.hasher.update(content);
    }

    pub fn finish(&self) -> String {
        let hash = self.hasher.finalize();
        hex::encode(&hash.as_bytes()[..FINGERPRINT_BYTES])
    }
}
