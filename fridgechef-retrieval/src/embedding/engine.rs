//! Embedding engine over fastembed
//!
//! Lazily initializes the ONNX model on first use. Initialization is
//! single-flight and its outcome is sticky: a failed load is reported
//! to every caller without re-downloading per request. Embeddings are
//! memoized per text.

use dashmap::DashMap;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::OnceLock;

use super::TextEncoder;
use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};

/// Resolve a configured model name, defaulting with a warning
fn resolve_model(name: &str) -> EmbeddingModel {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        other => {
            log::warn!(
                "Unknown embedding model {:?}, using all-MiniLM-L6-v2",
                other
            );
            EmbeddingModel::AllMiniLML6V2
        }
    }
}

/// Text encoder backed by a fastembed ONNX model
pub struct EmbeddingEngine {
    model_name: String,
    dimension: usize,
    batch_size: usize,
    cache_dir: Option<PathBuf>,
    model: OnceLock<std::result::Result<TextEmbedding, String>>,
    memo: DashMap<String, Vec<f32>>,
}

impl EmbeddingEngine {
    /// Create an engine from configuration (the model is not loaded yet)
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            model_name: config.model_name.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size,
            cache_dir: config.model_cache_dir.clone(),
            model: OnceLock::new(),
            memo: DashMap::new(),
        }
    }

    /// The model name this engine was configured with
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Whether the model finished loading successfully
    pub fn is_loaded(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    /// Number of memoized embeddings
    pub fn memo_size(&self) -> usize {
        self.memo.len()
    }

    /// Drop all memoized embeddings
    pub fn clear_memo(&self) {
        self.memo.clear();
    }

    fn model(&self) -> Result<&TextEmbedding> {
        match self.model.get_or_init(|| self.init_model()) {
            Ok(model) => Ok(model),
            Err(e) => Err(RetrievalError::model(e.clone())),
        }
    }

    fn init_model(&self) -> std::result::Result<TextEmbedding, String> {
        log::info!("Loading embedding model: {}...", self.model_name);

        let mut options =
            InitOptions::new(resolve_model(&self.model_name)).with_show_download_progress(false);
        if let Some(dir) = &self.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| format!("Failed to load embedding model: {}", e))?;

        // Get dimension by encoding a test string
        let probe = model
            .embed(vec!["test"], None)
            .map_err(|e| format!("Failed to encode test string: {}", e))?;
        let actual = probe.first().map(|v| v.len()).unwrap_or(0);
        if actual != self.dimension {
            return Err(format!(
                "Model dimension mismatch: expected {}, got {}",
                self.dimension, actual
            ));
        }

        log::info!(
            "Embedding model loaded successfully (dimension: {})",
            actual
        );
        Ok(model)
    }
}

impl TextEncoder for EmbeddingEngine {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        // Check memo first
        if let Some(cached) = self.memo.get(text) {
            return Ok(cached.clone());
        }

        let model = self.model()?;
        let mut vectors = model
            .embed(vec![text], None)
            .map_err(|e| RetrievalError::embedding(format!("Failed to encode text: {}", e)))?;
        let vector = vectors
            .pop()
            .ok_or_else(|| RetrievalError::embedding("Model returned no vectors"))?;

        self.memo.insert(text.to_string(), vector.clone());
        Ok(vector)
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Check memo for all texts
        let mut results: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| self.memo.get(text.as_str()).map(|v| v.clone()))
            .collect();

        // Find texts not yet memoized
        let uncached: Vec<(usize, &str)> = results
            .iter()
            .enumerate()
            .filter(|(_, cached)| cached.is_none())
            .map(|(i, _)| (i, texts[i].as_str()))
            .collect();

        if uncached.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        let model = self.model()?;
        let uncached_texts: Vec<&str> = uncached.iter().map(|(_, t)| *t).collect();
        let embeddings = model
            .embed(uncached_texts, Some(self.batch_size))
            .map_err(|e| RetrievalError::embedding(format!("Failed to encode batch: {}", e)))?;

        if embeddings.len() != uncached.len() {
            return Err(RetrievalError::embedding(format!(
                "Model returned {} vectors for {} texts",
                embeddings.len(),
                uncached.len()
            )));
        }

        // Fill memo and results
        for ((idx, text), embedding) in uncached.iter().zip(embeddings.into_iter()) {
            self.memo.insert((*text).to_string(), embedding.clone());
            results[*idx] = Some(embedding);
        }

        Ok(results.into_iter().flatten().collect())
    }
}
