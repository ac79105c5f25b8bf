//! Recipe corpus store
//!
//! Loads the corpus JSON once per process and serves lookups from
//! memory. The corpus is ordered; a recipe's position is its identity
//! for the vector index, so the loaded order is never changed.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::matching;
use crate::recipe::{MatchedRecipe, RawRecipe, Recipe};

/// Loaded corpus plus load diagnostics
#[derive(Debug, Default)]
pub struct Corpus {
    /// Validated recipes in file order
    pub recipes: Vec<Recipe>,
    /// Records rejected during validation
    pub skipped: usize,
}

/// Lazily loaded recipe store
///
/// Construction is cheap; the file is read on first access and
/// concurrent first readers share one load. A missing or unreadable
/// file logs an error and leaves the store empty rather than failing
/// callers.
pub struct RecipeStore {
    path: PathBuf,
    corpus: OnceLock<Corpus>,
}

impl RecipeStore {
    /// Create a store for the given corpus file (no IO yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            corpus: OnceLock::new(),
        }
    }

    /// The corpus, loading it on first use
    pub fn corpus(&self) -> &Corpus {
        self.corpus.get_or_init(|| load_corpus(&self.path))
    }

    /// All recipes in corpus order
    pub fn recipes(&self) -> &[Recipe] {
        &self.corpus().recipes
    }

    /// Total number of recipes
    pub fn count(&self) -> usize {
        self.corpus().recipes.len()
    }

    /// Records rejected during load
    pub fn skipped(&self) -> usize {
        self.corpus().skipped
    }

    /// Exact title lookup
    pub fn get_by_title(&self, title: &str) -> Option<&Recipe> {
        self.recipes().iter().find(|recipe| recipe.title == title)
    }

    /// Paginated slice of the corpus
    pub fn page(&self, limit: usize, offset: usize) -> &[Recipe] {
        let recipes = self.recipes();
        if offset >= recipes.len() {
            return &[];
        }
        let end = offset.saturating_add(limit).min(recipes.len());
        &recipes[offset..end]
    }

    /// Rank the whole corpus by ingredient matches
    pub fn filter_by_ingredients(&self, user_ingredients: &[String]) -> Vec<MatchedRecipe> {
        matching::rank_by_matches(self.recipes(), user_ingredients)
    }

    #[cfg(test)]
    pub(crate) fn from_recipes(recipes: Vec<Recipe>) -> Self {
        let store = Self::new("unused");
        let _ = store.corpus.set(Corpus {
            recipes,
            skipped: 0,
        });
        store
    }
}

fn load_corpus(path: &Path) -> Corpus {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Failed to read corpus {}: {}", path.display(), e);
            return Corpus::default();
        }
    };

    let raw: Vec<RawRecipe> = match serde_json::from_slice(&bytes) {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("Failed to parse corpus {}: {}", path.display(), e);
            return Corpus::default();
        }
    };

    let mut recipes = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for (i, record) in raw.into_iter().enumerate() {
        match Recipe::from_raw(record) {
            Ok(recipe) => recipes.push(recipe),
            Err(e) => {
                log::debug!("Skipping corpus record {}: {}", i, e);
                skipped += 1;
            }
        }
    }

    log::info!("Loaded {} recipes from {}", recipes.len(), path.display());
    if skipped > 0 {
        log::warn!("Skipped {} invalid recipes", skipped);
    }

    Corpus { recipes, skipped }
}
