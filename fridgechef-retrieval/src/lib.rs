//! FridgeChef Retrieval Core
//!
//! Hybrid recipe retrieval over a JSON corpus: semantic k-NN search
//! with an embedding model and a flat vector index, backed by
//! deterministic string matching whenever the vector path cannot
//! serve.
//!
//! ## Features
//!
//! - **Hybrid search** - Exact flat-index k-NN with a string-matching fallback
//! - **Truthful method tag** - Results name the path that actually produced them
//! - **Lazy loading** - Corpus, model and index load once, on first use
//! - **Result caching** - TTL cache keyed by normalized query parameters
//!
//! ## Example
//!
//! ```ignore
//! use fridgechef_retrieval::{RetrievalConfig, RetrievalEngine};
//!
//! // Wire the engine from environment-backed configuration
//! let config = RetrievalConfig::from_env();
//! let engine = RetrievalEngine::from_config(&config);
//!
//! // Recommend recipes for what's in the fridge
//! let ingredients = vec!["eggs".to_string(), "spinach".to_string()];
//! let retrieval = engine.recommend(&ingredients, true, 10)?;
//! for matched in &retrieval.results {
//!     println!("{} ({} matches)", matched.recipe.title, matched.matching_count);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod matching;
pub mod recipe;
pub mod store;

// Re-exports for convenience
pub use config::RetrievalConfig;
pub use embedding::{EmbeddingEngine, TextEncoder};
pub use engine::{Retrieval, RetrievalEngine};
pub use error::{Result, RetrievalError};
pub use index::{FlatIndex, IndexInfo, IndexKind, IndexMetadata, VectorIndex};
pub use recipe::{MatchedRecipe, Recipe, SearchMethod};
pub use store::RecipeStore;
