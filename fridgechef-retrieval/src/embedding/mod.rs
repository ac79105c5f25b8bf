//! Embedding module for semantic search
//!
//! Text preparation plus a fastembed-backed encoder behind the
//! [`TextEncoder`] trait.

mod engine;
mod prepare;

pub use engine::EmbeddingEngine;
pub use prepare::{ingredient_query, prepare_recipe_text};

use crate::error::Result;

/// Text-to-vector seam
///
/// The retrieval engine depends on this trait rather than a concrete
/// model, so search paths can be exercised with deterministic encoders
/// in tests.
pub trait TextEncoder: Send + Sync {
    /// Output vector dimension
    fn dimension(&self) -> usize;

    /// Encode a single text
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode a batch of texts, preserving input order
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
