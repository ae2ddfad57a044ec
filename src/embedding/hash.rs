//! Hash-based deterministic embedder.
//!
//! Produces reproducible pseudo-embeddings from word and trigram feature
//! hashing. This is lexical overlap, not semantics; it keeps the whole
//! pipeline runnable offline and byte-deterministic across processes,
//! which the real model cannot promise. xxh3 is used because its output
//! is stable across Rust releases, unlike `DefaultHasher`.

use crate::embedding::{Embedder, l2_normalize};
use crate::error::Result;
use xxhash_rust::xxh3::xxh3_64;

/// Identifier recorded next to embeddings produced by this embedder.
const FINGERPRINT: &str = "hash-xxh3-v1";

/// Deterministic feature-hash embedder.
///
/// # Examples
///
/// ```
/// use contextkit::embedding::{DEFAULT_DIMENSIONS, Embedder, HashEmbedder};
///
/// let embedder = HashEmbedder::new(DEFAULT_DIMENSIONS);
/// let vectors = embedder.embed(&["hello world"]).unwrap();
/// assert_eq!(vectors[0].len(), DEFAULT_DIMENSIONS);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of the given width.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let normalized: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    ' '
                }
            })
            .collect();

        // Word-level hashing carries the primary signal.
        for word in normalized.split_whitespace() {
            let hash = xxh3_64(word.as_bytes());
            let idx = (hash as usize) % self.dimensions;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            let magnitude = 1.0 + ((hash >> 16) & 0xFF) as f32 / 255.0;
            embedding[idx] += sign * magnitude;
        }

        // Character trigrams give fuzzy overlap across related identifiers.
        let chars: Vec<char> = normalized.chars().collect();
        for window in chars.windows(3) {
            let trigram: String = window.iter().collect();
            let hash = xxh3_64(trigram.as_bytes());
            let idx = (hash as usize) % self.dimensions;
            let sign = if (hash >> 32) & 1 == 0 { 0.5 } else { -0.5 };
            embedding[idx] += sign;
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn fingerprint(&self) -> &str {
        FINGERPRINT
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.generate(text)).collect())
    }
}
