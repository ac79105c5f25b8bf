//! Retrieval configuration
//!
//! Plain options struct with environment overrides. Unknown model or
//! index-type names are resolved to defaults at their use sites, with
//! a warning, rather than failing startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the retrieval stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Path to the recipe corpus JSON file
    pub data_path: PathBuf,
    /// Embedding model identifier
    pub model_name: String,
    /// Expected embedding dimension
    pub dimension: usize,
    /// Index type name ("IndexFlatL2" or "IndexFlatIP")
    pub index_kind: String,
    /// Distance metric name; informational, ranking follows the index type
    pub metric: String,
    /// Path to the serialized index
    pub index_path: PathBuf,
    /// Result cache entry lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Batch size for offline corpus encoding
    pub batch_size: usize,
    /// Optional directory for downloaded model files
    pub model_cache_dir: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/recipes.json"),
            model_name: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            index_kind: "IndexFlatL2".to_string(),
            metric: "L2".to_string(),
            index_path: PathBuf::from("data/recipe_index.bin"),
            cache_ttl_secs: 300,
            batch_size: 32,
            model_cache_dir: None,
        }
    }
}

impl RetrievalConfig {
    /// Defaults with `FRIDGECHEF_*` environment overrides applied
    ///
    /// Malformed numeric values are ignored with a warning; the default
    /// is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("FRIDGECHEF_DATA_PATH") {
            config.data_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_EMBEDDING_MODEL") {
            config.model_name = v;
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_EMBEDDING_DIMENSION") {
            match v.parse() {
                Ok(n) => config.dimension = n,
                Err(_) => {
                    log::warn!("Ignoring non-numeric FRIDGECHEF_EMBEDDING_DIMENSION: {:?}", v)
                }
            }
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_INDEX_TYPE") {
            config.index_kind = v;
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_INDEX_METRIC") {
            config.metric = v;
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_INDEX_PATH") {
            config.index_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_CACHE_TTL_SECS") {
            match v.parse() {
                Ok(n) => config.cache_ttl_secs = n,
                Err(_) => log::warn!("Ignoring non-numeric FRIDGECHEF_CACHE_TTL_SECS: {:?}", v),
            }
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_BATCH_SIZE") {
            match v.parse() {
                Ok(n) => config.batch_size = n,
                Err(_) => log::warn!("Ignoring non-numeric FRIDGECHEF_BATCH_SIZE: {:?}", v),
            }
        }
        if let Ok(v) = std::env::var("FRIDGECHEF_MODEL_CACHE_DIR") {
            config.model_cache_dir = Some(PathBuf::from(v));
        }

        config
    }
}
