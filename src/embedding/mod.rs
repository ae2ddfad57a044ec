//! Embedding generation.
//!
//! The [`Embedder`] capability produces fixed-dimensional vectors for
//! text. Implementations are pluggable: the default is a deterministic
//! hash-based embedder; the `fastembed-embeddings` feature swaps in a real
//! semantic model. Vector dimensionality is uniform within one index
//! database, enforced by recording the model fingerprint in the store.

mod hash;

#[cfg(feature = "fastembed-embeddings")]
mod fastembed_impl;

pub use hash::HashEmbedder;

#[cfg(feature = "fastembed-embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

use crate::error::Result;

/// Default embedding dimensions.
///
/// Matches all-MiniLM-L6-v2 so a database embedded with the hash fallback
/// keeps the same vector width as one embedded with the real model.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Capability: turn a batch of texts into same-width vectors.
///
/// Implementations must be thread-safe; the indexer embeds batches in
/// parallel up to its in-flight cap.
pub trait Embedder: Send + Sync {
    /// Vector width produced by this embedder.
    fn dimensions(&self) -> usize;

    /// Stable identifier of the model, recorded next to each embedding.
    fn fingerprint(&self) -> &str;

    /// Embeds a batch of texts, one vector per input, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Embedding`] when generation fails; the
    /// `retriable` flag tells the indexer whether backoff makes sense.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Creates the default embedder for the enabled features.
///
/// # Errors
///
/// Returns an error if model initialization fails (the hash fallback never
/// fails).
#[cfg(feature = "fastembed-embeddings")]
pub fn create_embedder() -> Result<Box<dyn Embedder>> {
    Ok(Box::new(FastEmbedEmbedder::new()?))
}

/// Creates the default embedder for the enabled features.
///
/// # Errors
///
/// Returns an error if model initialization fails (the hash fallback never
/// fails).
#[cfg(not(feature = "fastembed-embeddings"))]
pub fn create_embedder() -> Result<Box<dyn Embedder>> {
    Ok(Box::new(HashEmbedder::new(DEFAULT_DIMENSIONS)))
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero vectors. For L2-normalized
/// vectors this is exactly the dot product, which is why the store
/// normalizes at insertion time.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Scales a vector to unit length in place. Zero vectors are left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_normalized_dot_equals_cosine() {
        let mut a = vec![1.0, 2.0, 3.0];
        let mut b = vec![2.0, 1.0, 0.5];
        let cosine = cosine_similarity(&a, &b);
        l2_normalize(&mut a);
        l2_normalize(&mut b);
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        assert!((dot - cosine).abs() < 1e-5);
    }

    #[test]
    fn test_create_embedder_dimensions() {
        let embedder = create_embedder().unwrap();
        assert_eq!(embedder.dimensions(), DEFAULT_DIMENSIONS);
        assert!(!embedder.fingerprint().is_empty());
    }
}
