//! `FastEmbed`-based semantic embedder.
//!
//! Real semantic embeddings via all-MiniLM-L6-v2. Only compiled with the
//! `fastembed-embeddings` feature.

use crate::embedding::{DEFAULT_DIMENSIONS, Embedder, l2_normalize};
use crate::error::{Error, Result};
use std::sync::{Mutex, OnceLock};

/// Lazily-initialized shared model instance. Loading the model costs
/// seconds; doing it on first embed keeps cold starts cheap for commands
/// that never embed.
static MODEL: OnceLock<Mutex<fastembed::TextEmbedding>> = OnceLock::new();

/// Identifier recorded next to embeddings produced by this embedder.
const FINGERPRINT: &str = "fastembed-all-MiniLM-L6-v2";

/// Semantic embedder backed by fastembed-rs.
pub struct FastEmbedEmbedder {
    _private: (),
}

impl FastEmbedEmbedder {
    /// Creates the embedder. The model itself loads on first use.
    ///
    /// # Errors
    ///
    /// Never fails today; kept fallible for parity with other embedders.
    pub fn new() -> Result<Self> {
        Ok(Self { _private: () })
    }

    fn model() -> Result<&'static Mutex<fastembed::TextEmbedding>> {
        if let Some(model) = MODEL.get() {
            return Ok(model);
        }

        let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(false);
        let model = fastembed::TextEmbedding::try_new(options).map_err(|e| Error::Embedding {
            message: format!("failed to load embedding model: {e}"),
            retriable: true,
        })?;

        // Ignore the race: whichever thread stored first wins.
        let _ = MODEL.set(Mutex::new(model));
        MODEL.get().ok_or_else(|| Error::Embedding {
            message: "model initialization race".to_string(),
            retriable: true,
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }

    fn fingerprint(&self) -> &str {
        FINGERPRINT
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Self::model()?;
        let mut model = model.lock().map_err(|e| Error::Embedding {
            message: format!("model lock poisoned: {e}"),
            retriable: false,
        })?;
        let inputs: Vec<String> = texts.iter().map(ToString::to_string).collect();
        let mut vectors = model.embed(inputs, None).map_err(|e| Error::Embedding {
            message: e.to_string(),
            retriable: true,
        })?;
        for vector in &mut vectors {
            l2_normalize(vector);
        }
        Ok(vectors)
    }
}
