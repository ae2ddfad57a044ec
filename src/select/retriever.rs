//! Candidate retrieval by vector similarity.
//!
//! Embeds the query once and scores every in-scope chunk embedding with a
//! dot product (vectors are L2-normalized at insertion time, so the dot
//! product is the cosine). Brute force is fine at this scale; an
//! approximate structure could replace the scan above ~50k chunks without
//! changing this interface.

use crate::core::Chunk;
use crate::embedding::{Embedder, l2_normalize};
use crate::error::{Error, Result};
use crate::storage::Store;

/// Default number of candidates handed to the ranker.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 50;

/// A chunk with its query similarity in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity against the query, clamped to `[0, 1]`.
    pub similarity: f32,
}

/// Retrieves the top-`limit` chunks for `query`.
///
/// # Errors
///
/// Returns [`Error::IndexEmpty`] when no embedded chunks are in scope, or
/// an embedding error for the query itself.
pub fn retrieve(
    store: &dyn Store,
    embedder: &dyn Embedder,
    query: &str,
    sources: Option<&[String]>,
    limit: usize,
) -> Result<Vec<Candidate>> {
    let chunks = store.chunks_with_embeddings(sources)?;
    if chunks.is_empty() {
        return Err(Error::IndexEmpty);
    }

    let mut query_vec = embedder
        .embed(&[query])?
        .pop()
        .ok_or_else(|| Error::Query("embedder returned no vector for the query".to_string()))?;
    l2_normalize(&mut query_vec);

    let mut candidates: Vec<Candidate> = chunks
        .into_iter()
        .filter_map(|chunk| {
            let embedding = chunk.embedding.as_deref()?;
            if embedding.len() != query_vec.len() {
                // A chunk embedded under a different model; invisible to
                // search until re-embedded.
                return None;
            }
            let dot: f32 = embedding
                .iter()
                .zip(query_vec.iter())
                .map(|(a, b)| a * b)
                .sum();
            Some(Candidate {
                similarity: dot.clamp(0.0, 1.0),
                chunk,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
            .then_with(|| a.chunk.start_line.cmp(&b.chunk.start_line))
    });
    candidates.truncate(limit);
    Ok(candidates)
}
