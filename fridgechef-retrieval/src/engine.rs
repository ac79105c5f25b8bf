//! Retrieval orchestration
//!
//! The engine ties the corpus, the encoder, the vector index and the
//! result cache together. Vector search runs when it is requested and
//! everything it needs is available; any failure on that path falls
//! back to deterministic string matching. Callers never see
//! vector-path errors, only which path served them.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{key_for, ResultCache};
use crate::config::RetrievalConfig;
use crate::embedding::{ingredient_query, EmbeddingEngine, TextEncoder};
use crate::error::{Result, RetrievalError};
use crate::index::VectorIndex;
use crate::matching;
use crate::recipe::{MatchedRecipe, SearchMethod};
use crate::store::RecipeStore;

/// A ranked result set tagged with the path that produced it
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub results: Vec<MatchedRecipe>,
    #[serde(rename = "search_method")]
    pub method: SearchMethod,
}

/// Why the vector path could not serve a request
///
/// Matched exhaustively at the orchestration layer so every failure
/// mode has an explicit fallback decision.
enum VectorPathError {
    IndexUnavailable(String),
    Encoding(String),
    Search(String),
}

/// Cache key parameters for `recommend`
///
/// Ingredients are sorted so permutations of the same pantry hit the
/// same entry.
#[derive(Serialize)]
struct RecommendKey {
    ingredients: Vec<String>,
    use_vector_search: bool,
    top_k: usize,
}

impl RecommendKey {
    fn new(ingredients: &[String], use_vector_search: bool, top_k: usize) -> Self {
        let mut ingredients = ingredients.to_vec();
        ingredients.sort();
        Self {
            ingredients,
            use_vector_search,
            top_k,
        }
    }
}

/// Cache key parameters for `search`
#[derive(Serialize)]
struct SearchKey<'a> {
    query: &'a str,
    top_k: usize,
}

/// Hybrid retrieval engine
pub struct RetrievalEngine {
    store: Arc<RecipeStore>,
    encoder: Arc<dyn TextEncoder>,
    index: Arc<VectorIndex>,
    cache: ResultCache<Retrieval>,
}

impl RetrievalEngine {
    /// Assemble an engine from its components
    pub fn new(
        store: Arc<RecipeStore>,
        encoder: Arc<dyn TextEncoder>,
        index: Arc<VectorIndex>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            encoder,
            index,
            cache: ResultCache::new(cache_ttl),
        }
    }

    /// Wire up the default components from configuration
    pub fn from_config(config: &RetrievalConfig) -> Self {
        let store = Arc::new(RecipeStore::new(config.data_path.clone()));
        let encoder: Arc<dyn TextEncoder> = Arc::new(EmbeddingEngine::new(config));
        let index = Arc::new(VectorIndex::new(config));
        Self::new(
            store,
            encoder,
            index,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Cached result sets currently held
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Recommend recipes for a set of on-hand ingredients
    ///
    /// Blank ingredients are discarded; an empty list after trimming
    /// is rejected. When `use_vector_search` is set the vector path is
    /// tried first and string matching takes over on any failure. The
    /// result set is cached under the normalized parameters together
    /// with the method tag, so a cache hit reports the path that
    /// originally served it.
    pub fn recommend(
        &self,
        ingredients: &[String],
        use_vector_search: bool,
        top_k: usize,
    ) -> Result<Retrieval> {
        let ingredients: Vec<String> = ingredients
            .iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        if ingredients.is_empty() {
            return Err(RetrievalError::invalid_query("No ingredients provided"));
        }
        if top_k == 0 {
            return Err(RetrievalError::invalid_query("top_k must be positive"));
        }

        let key = key_for(
            "recommend",
            &RecommendKey::new(&ingredients, use_vector_search, top_k),
        )?;
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("Returning cached recommendations");
            return Ok(cached);
        }

        let retrieval = if use_vector_search {
            match self.vector_recommend(&ingredients, top_k) {
                Ok(results) => Retrieval {
                    results,
                    method: SearchMethod::Vector,
                },
                Err(VectorPathError::IndexUnavailable(msg)) => {
                    log::warn!(
                        "Vector index unavailable ({}), falling back to string matching",
                        msg
                    );
                    self.string_recommend(&ingredients, top_k)
                }
                Err(VectorPathError::Encoding(msg)) => {
                    log::warn!(
                        "Query encoding failed ({}), falling back to string matching",
                        msg
                    );
                    self.string_recommend(&ingredients, top_k)
                }
                Err(VectorPathError::Search(msg)) => {
                    log::warn!(
                        "Vector search failed ({}), falling back to string matching",
                        msg
                    );
                    self.string_recommend(&ingredients, top_k)
                }
            }
        } else {
            self.string_recommend(&ingredients, top_k)
        };

        self.cache.set(key, retrieval.clone());
        Ok(retrieval)
    }

    /// Vector path for `recommend`
    ///
    /// Results stay in index rank order; ingredient matches are
    /// recomputed on them purely for display. Positions the corpus no
    /// longer has are dropped, not errors.
    fn vector_recommend(
        &self,
        ingredients: &[String],
        top_k: usize,
    ) -> std::result::Result<Vec<MatchedRecipe>, VectorPathError> {
        if !self.index.load() {
            return Err(VectorPathError::IndexUnavailable(
                "index not loaded".to_string(),
            ));
        }

        let query = ingredient_query(ingredients);
        let vector = self
            .encoder
            .encode(&query)
            .map_err(|e| VectorPathError::Encoding(e.to_string()))?;

        let recipes = self.store.recipes();
        let k = top_k.min(recipes.len());
        if k == 0 {
            return Err(VectorPathError::Search("corpus is empty".to_string()));
        }
        let hits = self
            .index
            .search(&vector, k)
            .map_err(|e| VectorPathError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(hits.len());
        for (_score, position) in hits {
            match recipes.get(position) {
                Some(recipe) => {
                    let matched = matching::matching_ingredients(recipe, ingredients);
                    results.push(MatchedRecipe {
                        recipe: recipe.clone(),
                        matching_count: matched.len(),
                        matching_ingredients: matched,
                    });
                }
                None => {
                    log::debug!("Dropping out-of-range index position {}", position);
                }
            }
        }
        Ok(results)
    }

    /// String path for `recommend`: ranked substring matches
    fn string_recommend(&self, ingredients: &[String], top_k: usize) -> Retrieval {
        let mut results = self.store.filter_by_ingredients(ingredients);
        results.truncate(top_k);
        Retrieval {
            results,
            method: SearchMethod::StringMatching,
        }
    }

    /// Free-text search over the corpus
    ///
    /// The query is encoded verbatim; there is no ingredient context,
    /// so results carry zero match counts. On any vector-path failure
    /// the fallback scans titles for the query, case-insensitively, in
    /// corpus order.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Retrieval> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::invalid_query("No query provided"));
        }
        if top_k == 0 {
            return Err(RetrievalError::invalid_query("top_k must be positive"));
        }

        let key = key_for("search", &SearchKey { query, top_k })?;
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("Returning cached search results");
            return Ok(cached);
        }

        let retrieval = match self.vector_search(query, top_k) {
            Ok(results) => Retrieval {
                results,
                method: SearchMethod::Vector,
            },
            Err(VectorPathError::IndexUnavailable(msg)) => {
                log::warn!(
                    "Vector index unavailable ({}), falling back to title search",
                    msg
                );
                self.title_search(query, top_k)
            }
            Err(VectorPathError::Encoding(msg)) => {
                log::warn!(
                    "Query encoding failed ({}), falling back to title search",
                    msg
                );
                self.title_search(query, top_k)
            }
            Err(VectorPathError::Search(msg)) => {
                log::warn!(
                    "Vector search failed ({}), falling back to title search",
                    msg
                );
                self.title_search(query, top_k)
            }
        };

        self.cache.set(key, retrieval.clone());
        Ok(retrieval)
    }

    fn vector_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> std::result::Result<Vec<MatchedRecipe>, VectorPathError> {
        if !self.index.load() {
            return Err(VectorPathError::IndexUnavailable(
                "index not loaded".to_string(),
            ));
        }

        let vector = self
            .encoder
            .encode(query)
            .map_err(|e| VectorPathError::Encoding(e.to_string()))?;

        let recipes = self.store.recipes();
        let k = top_k.min(recipes.len());
        if k == 0 {
            return Err(VectorPathError::Search("corpus is empty".to_string()));
        }
        let hits = self
            .index
            .search(&vector, k)
            .map_err(|e| VectorPathError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(hits.len());
        for (_score, position) in hits {
            match recipes.get(position) {
                Some(recipe) => results.push(MatchedRecipe {
                    recipe: recipe.clone(),
                    matching_count: 0,
                    matching_ingredients: Vec::new(),
                }),
                None => {
                    log::debug!("Dropping out-of-range index position {}", position);
                }
            }
        }
        Ok(results)
    }

    /// Fallback for free-text search: title substring scan
    fn title_search(&self, query: &str, top_k: usize) -> Retrieval {
        let needle = query.to_lowercase();
        let mut results = Vec::new();
        for recipe in self.store.recipes() {
            if recipe.title.to_lowercase().contains(&needle) {
                results.push(MatchedRecipe {
                    recipe: recipe.clone(),
                    matching_count: 0,
                    matching_ingredients: Vec::new(),
                });
                if results.len() == top_k {
                    break;
                }
            }
        }
        Retrieval {
            results,
            method: SearchMethod::StringMatching,
        }
    }
}
