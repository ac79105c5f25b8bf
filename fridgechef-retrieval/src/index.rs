//! Flat vector index
//!
//! Exact-scan index over recipe embeddings, persisted with bincode and
//! described by a JSON metadata sidecar. Row `i` of the index maps to
//! corpus position `i`; that alignment is the only thing search
//! correctness depends on. Load failures are logged individually but
//! collapse to an unavailable index, never an error to callers.

use chrono::{DateTime, Utc};
use parking_lot::{Once, RwLock};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::recipe::Recipe;

/// Flat index variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Squared Euclidean distance, ascending (lower is better)
    FlatL2,
    /// Inner product, descending (higher is better)
    FlatIp,
}

impl IndexKind {
    /// Resolve a configured name, defaulting with a warning
    pub fn from_name(name: &str) -> Self {
        match name {
            "IndexFlatL2" => Self::FlatL2,
            "IndexFlatIP" => Self::FlatIp,
            other => {
                log::warn!("Unknown index type {:?}, using IndexFlatL2 as default", other);
                Self::FlatL2
            }
        }
    }

    /// Configuration-name spelling
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlatL2 => "IndexFlatL2",
            Self::FlatIp => "IndexFlatIP",
        }
    }

    /// Metric implied by the kind
    pub fn metric(&self) -> &'static str {
        match self {
            Self::FlatL2 => "L2",
            Self::FlatIp => "IP",
        }
    }
}

/// Serialized index payload: row-major vectors plus shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    kind: IndexKind,
    dimension: usize,
    count: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Assemble an index from row vectors
    ///
    /// Every row must have the declared dimension; mismatches fail
    /// fast and produce no index.
    pub fn from_rows(kind: IndexKind, dimension: usize, rows: &[Vec<f32>]) -> Result<Self> {
        let mut vectors = Vec::with_capacity(rows.len() * dimension);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dimension {
                log::error!(
                    "Embedding {} has dimension {}, expected {}",
                    i,
                    row.len(),
                    dimension
                );
                return Err(RetrievalError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            vectors.extend_from_slice(row);
        }
        Ok(Self {
            kind,
            dimension,
            count: rows.len(),
            vectors,
        })
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed vectors
    pub fn count(&self) -> usize {
        self.count
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Exact scan over all rows, best match first
    ///
    /// Returns `(score, position)` pairs. The sort is stable, so equal
    /// scores preserve row order. The caller validates dimension and k.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(f32, usize)> {
        let mut scored: Vec<(f32, usize)> = (0..self.count)
            .map(|i| {
                let score = match self.kind {
                    IndexKind::FlatL2 => squared_l2(query, self.row(i)),
                    IndexKind::FlatIp => inner_product(query, self.row(i)),
                };
                (score, i)
            })
            .collect();

        match self.kind {
            IndexKind::FlatL2 => {
                scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
            }
            IndexKind::FlatIp => {
                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal))
            }
        }

        scored.truncate(k);
        scored
    }
}

/// Squared L2 distance (no square root; ordering is unaffected)
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// JSON metadata sidecar written next to the index
///
/// Diagnostics only: search correctness never depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub index_type: String,
    pub metric: String,
    pub dimension: usize,
    pub vector_count: usize,
    pub built_at: DateTime<Utc>,
    pub recipes: Vec<RecipeRef>,
}

/// Per-row audit entry in the metadata sidecar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRef {
    pub position: usize,
    pub title: String,
    pub image_name: String,
}

/// Diagnostics snapshot for operators
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub loaded: bool,
    pub index_type: String,
    pub metric: String,
    pub dimension: usize,
    pub vector_count: usize,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Why a load attempt produced no index
enum LoadFailure {
    Missing,
    EmptyFile,
    Corrupt(bincode::Error),
    ZeroVectors,
    DimensionMismatch { expected: usize, actual: usize },
    Truncated { expected: usize, actual: usize },
    Io(std::io::Error),
}

impl LoadFailure {
    fn log(&self, path: &Path) {
        match self {
            Self::Missing => {
                log::warn!("Index file not found: {}", path.display());
                log::info!("Vector search will not be available, using fallback search");
            }
            Self::EmptyFile => {
                log::error!("Index file is empty: {}", path.display());
            }
            Self::Corrupt(e) => {
                log::error!(
                    "Failed to read index file {}, it may be corrupted: {}",
                    path.display(),
                    e
                );
            }
            Self::ZeroVectors => {
                log::warn!("Index {} contains no vectors", path.display());
            }
            Self::DimensionMismatch { expected, actual } => {
                log::error!(
                    "Index dimension mismatch: expected {}, got {}. Index may be incompatible",
                    expected,
                    actual
                );
            }
            Self::Truncated { expected, actual } => {
                log::error!(
                    "Index payload holds {} floats, expected {}: {}",
                    actual,
                    expected,
                    path.display()
                );
            }
            Self::Io(e) => {
                log::error!("Failed to read index file {}: {}", path.display(), e);
            }
        }
    }
}

/// Vector index lifecycle: build, persist, lazy load, search
///
/// At most one load attempt runs per process, even under concurrent
/// first access; after that the index is immutable shared state.
pub struct VectorIndex {
    index_path: PathBuf,
    kind: IndexKind,
    dimension: usize,
    index: RwLock<Option<FlatIndex>>,
    metadata: RwLock<Option<IndexMetadata>>,
    load_once: Once,
}

impl VectorIndex {
    /// Create an index handle from configuration (no IO yet)
    pub fn new(config: &RetrievalConfig) -> Self {
        let kind = IndexKind::from_name(&config.index_kind);
        if config.metric != kind.metric() {
            log::warn!(
                "Configured metric {:?} does not match index type {}, ranking follows the index type",
                config.metric,
                kind.name()
            );
        }
        Self {
            index_path: config.index_path.clone(),
            kind,
            dimension: config.dimension,
            index: RwLock::new(None),
            metadata: RwLock::new(None),
            load_once: Once::new(),
        }
    }

    fn metadata_path(&self) -> PathBuf {
        self.index_path.with_extension("meta.json")
    }

    fn embeddings_path(&self) -> PathBuf {
        self.index_path.with_extension("embeddings.bin")
    }

    /// Build the index from per-recipe embeddings and persist it
    ///
    /// Row count must equal the corpus length and every row must have
    /// the configured dimension; any mismatch fails fast with no
    /// partial index written. On success the index is also installed
    /// in memory, ready for search.
    pub fn build(&self, embeddings: &[Vec<f32>], recipes: &[Recipe]) -> Result<()> {
        log::info!(
            "Building {} index: {} embeddings, {} recipes",
            self.kind.name(),
            embeddings.len(),
            recipes.len()
        );

        if embeddings.len() != recipes.len() {
            return Err(RetrievalError::corpus(format!(
                "Embeddings count ({}) doesn't match recipes count ({})",
                embeddings.len(),
                recipes.len()
            )));
        }
        if embeddings.is_empty() {
            return Err(RetrievalError::corpus("Cannot build an index from zero recipes"));
        }

        let index = FlatIndex::from_rows(self.kind, self.dimension, embeddings)?;

        let metadata = IndexMetadata {
            index_type: self.kind.name().to_string(),
            metric: self.kind.metric().to_string(),
            dimension: self.dimension,
            vector_count: index.count,
            built_at: Utc::now(),
            recipes: recipes
                .iter()
                .enumerate()
                .map(|(position, recipe)| RecipeRef {
                    position,
                    title: recipe.title.clone(),
                    image_name: recipe.image_name.clone(),
                })
                .collect(),
        };

        if let Some(parent) = self.index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.index_path, bincode::serialize(&index)?)?;
        log::info!("Index saved to: {}", self.index_path.display());

        std::fs::write(self.metadata_path(), serde_json::to_vec_pretty(&metadata)?)?;
        log::info!("Metadata saved to: {}", self.metadata_path().display());

        // Raw embeddings kept for reference, not required for search
        std::fs::write(self.embeddings_path(), bincode::serialize(&embeddings)?)?;

        *self.index.write() = Some(index);
        *self.metadata.write() = Some(metadata);

        Ok(())
    }

    /// Attempt to load the persisted index, once per process
    ///
    /// Returns readiness. Every failure mode (missing, empty, corrupt,
    /// zero vectors, wrong dimension) is logged and collapses to
    /// `false`; nothing is raised.
    pub fn load(&self) -> bool {
        self.load_once.call_once(|| {
            if self.index.read().is_some() {
                return;
            }
            match self.try_load() {
                Ok(index) => {
                    log::info!(
                        "Index loaded successfully from: {} ({} vectors, dimension {})",
                        self.index_path.display(),
                        index.count,
                        index.dimension
                    );
                    let metadata = self.load_metadata(&index);
                    *self.metadata.write() = metadata;
                    *self.index.write() = Some(index);

                    if self.embeddings_path().exists() {
                        log::debug!(
                            "Raw embeddings present at: {}",
                            self.embeddings_path().display()
                        );
                    }
                }
                Err(failure) => failure.log(&self.index_path),
            }
        });
        self.is_ready()
    }

    fn try_load(&self) -> std::result::Result<FlatIndex, LoadFailure> {
        if !self.index_path.exists() {
            return Err(LoadFailure::Missing);
        }

        let bytes = std::fs::read(&self.index_path).map_err(LoadFailure::Io)?;
        if bytes.is_empty() {
            return Err(LoadFailure::EmptyFile);
        }

        let index: FlatIndex = bincode::deserialize(&bytes).map_err(LoadFailure::Corrupt)?;

        if index.count == 0 {
            return Err(LoadFailure::ZeroVectors);
        }
        if index.dimension != self.dimension {
            return Err(LoadFailure::DimensionMismatch {
                expected: self.dimension,
                actual: index.dimension,
            });
        }
        if index.vectors.len() != index.count * index.dimension {
            return Err(LoadFailure::Truncated {
                expected: index.count * index.dimension,
                actual: index.vectors.len(),
            });
        }
        if index.kind != self.kind {
            // The file knows its own ranking convention; honor it
            log::warn!(
                "Index file is {} but configuration says {}, using the file's kind",
                index.kind.name(),
                self.kind.name()
            );
        }

        Ok(index)
    }

    fn load_metadata(&self, index: &FlatIndex) -> Option<IndexMetadata> {
        let path = self.metadata_path();
        if !path.exists() {
            return None;
        }
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to load metadata: {}", e);
                return None;
            }
        };
        match serde_json::from_slice::<IndexMetadata>(&bytes) {
            Ok(metadata) => {
                if metadata.vector_count != index.count {
                    log::warn!(
                        "Metadata vector count ({}) doesn't match index ({})",
                        metadata.vector_count,
                        index.count
                    );
                }
                Some(metadata)
            }
            Err(e) => {
                log::warn!("Failed to load metadata: {}", e);
                None
            }
        }
    }

    /// Whether an index is in memory and searchable
    pub fn is_ready(&self) -> bool {
        self.index.read().is_some()
    }

    /// k-nearest search over the loaded index
    ///
    /// Validates the query dimension and `k > 0`, clamps `k` to the
    /// vector count with a warning, returns `(score, position)` pairs
    /// best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, usize)>> {
        let guard = self.index.read();
        let index = guard
            .as_ref()
            .ok_or_else(|| RetrievalError::index_unavailable("index not loaded"))?;

        if query.is_empty() || query.len() != index.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Err(RetrievalError::invalid_query("k must be positive"));
        }

        let k = if k > index.count {
            log::warn!(
                "Requested k={} is greater than total vectors ({}), returning {} results",
                k,
                index.count,
                index.count
            );
            index.count
        } else {
            k
        };

        Ok(index.search(query, k))
    }

    /// Metadata from the last build or load, if any
    pub fn metadata(&self) -> Option<IndexMetadata> {
        self.metadata.read().clone()
    }

    /// Information about the index for diagnostics
    pub fn info(&self) -> IndexInfo {
        let guard = self.index.read();
        match guard.as_ref() {
            Some(index) => IndexInfo {
                loaded: true,
                index_type: index.kind.name().to_string(),
                metric: index.kind.metric().to_string(),
                dimension: index.dimension,
                vector_count: index.count,
                index_path: self.index_path.clone(),
                metadata_path: self.metadata_path(),
            },
            None => IndexInfo {
                loaded: false,
                index_type: self.kind.name().to_string(),
                metric: self.kind.metric().to_string(),
                dimension: self.dimension,
                vector_count: 0,
                index_path: self.index_path.clone(),
                metadata_path: self.metadata_path(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::RawRecipe;

    fn test_config(dir: &Path, dimension: usize) -> RetrievalConfig {
        RetrievalConfig {
            index_path: dir.join("recipe_index.bin"),
            dimension,
            ..RetrievalConfig::default()
        }
    }

    fn test_recipes(n: usize) -> Vec<Recipe> {
        (0..n)
            .map(|i| {
                Recipe::from_raw(RawRecipe {
                    title: Some(format!("Recipe {}", i)),
                    ingredients: Some(format!("['ingredient {}']", i)),
                    instructions: None,
                    image_name: Some(format!("recipe-{}", i)),
                    cleaned_ingredients: Some(format!("['ingredient {}']", i)),
                })
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(IndexKind::from_name("IndexFlatL2"), IndexKind::FlatL2);
        assert_eq!(IndexKind::from_name("IndexFlatIP"), IndexKind::FlatIp);
        assert_eq!(IndexKind::from_name("IndexHNSW"), IndexKind::FlatL2);
    }

    #[test]
    fn test_flat_l2_orders_ascending() {
        let rows = vec![
            vec![10.0, 0.0],
            vec![1.0, 0.0],
            vec![5.0, 0.0],
        ];
        let index = FlatIndex::from_rows(IndexKind::FlatL2, 2, &rows).unwrap();
        let hits = index.search(&[0.0, 0.0], 3);

        let positions: Vec<usize> = hits.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        // Squared distances
        assert_eq!(hits[0].0, 1.0);
        assert_eq!(hits[1].0, 25.0);
        assert_eq!(hits[2].0, 100.0);
    }

    #[test]
    fn test_flat_ip_orders_descending() {
        let rows = vec![
            vec![1.0, 0.0],
            vec![3.0, 0.0],
            vec![2.0, 0.0],
        ];
        let index = FlatIndex::from_rows(IndexKind::FlatIp, 2, &rows).unwrap();
        let hits = index.search(&[1.0, 0.0], 3);

        let positions: Vec<usize> = hits.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        assert_eq!(hits[0].0, 3.0);
    }

    #[test]
    fn test_search_ties_preserve_row_order() {
        let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
        let index = FlatIndex::from_rows(IndexKind::FlatL2, 2, &rows).unwrap();
        let hits = index.search(&[1.0, 0.0], 3);

        assert_eq!(hits[0].1, 0);
        assert_eq!(hits[1].1, 2);
        assert_eq!(hits[2].1, 1);
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let rows = vec![vec![1.0, 0.0], vec![1.0]];
        let err = FlatIndex::from_rows(IndexKind::FlatL2, 2, &rows).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_build_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let recipes = test_recipes(3);
        let embeddings = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]];

        let built = VectorIndex::new(&config);
        built.build(&embeddings, &recipes).unwrap();
        assert!(built.is_ready());

        // A fresh handle loads from disk
        let loaded = VectorIndex::new(&config);
        assert!(loaded.load());
        let hits = loaded.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].1, 0);
        assert_eq!(hits[1].1, 1);

        let metadata = loaded.metadata().unwrap();
        assert_eq!(metadata.vector_count, 3);
        assert_eq!(metadata.recipes[1].position, 1);
        assert_eq!(metadata.recipes[1].title, "Recipe 1");
    }

    #[test]
    fn test_build_rejects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);

        let err = index
            .build(&[vec![0.0, 0.0]], &test_recipes(2))
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Corpus(_)));
        assert!(!index.is_ready());
        assert!(!config.index_path.exists());
    }

    #[test]
    fn test_build_rejects_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);
        assert!(index.build(&[], &[]).is_err());
    }

    #[test]
    fn test_load_missing_file_is_unready() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);
        assert!(!index.load());
        assert!(!index.is_ready());
    }

    #[test]
    fn test_load_empty_file_is_unready() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        std::fs::write(&config.index_path, b"").unwrap();

        let index = VectorIndex::new(&config);
        assert!(!index.load());
    }

    #[test]
    fn test_load_corrupt_file_is_unready() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        std::fs::write(&config.index_path, b"definitely not bincode").unwrap();

        let index = VectorIndex::new(&config);
        assert!(!index.load());
    }

    #[test]
    fn test_load_zero_vector_index_is_unready() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        // build() refuses empty input, so craft the file directly
        let empty = FlatIndex::from_rows(IndexKind::FlatL2, 2, &[]).unwrap();
        std::fs::write(&config.index_path, bincode::serialize(&empty).unwrap()).unwrap();

        let index = VectorIndex::new(&config);
        assert!(!index.load());
        assert!(!index.is_ready());
    }

    #[test]
    fn test_load_dimension_mismatch_is_unready() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);
        index
            .build(&[vec![0.0, 0.0]], &test_recipes(1))
            .unwrap();

        // Same file, different configured dimension
        let config384 = RetrievalConfig {
            dimension: 384,
            ..test_config(dir.path(), 2)
        };
        let mismatched = VectorIndex::new(&config384);
        assert!(!mismatched.load());
    }

    #[test]
    fn test_load_attempt_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);

        assert!(!index.load());
        // Index appearing after the first attempt is not picked up
        let other = VectorIndex::new(&config);
        other
            .build(&[vec![0.0, 0.0]], &test_recipes(1))
            .unwrap();
        assert!(!index.load());
        assert!(index.search(&[0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_search_clamps_k() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);
        index
            .build(&[vec![0.0, 0.0], vec![1.0, 0.0]], &test_recipes(2))
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 50).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_search_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);
        index
            .build(&[vec![0.0, 0.0]], &test_recipes(1))
            .unwrap();

        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 1).unwrap_err(),
            RetrievalError::DimensionMismatch { .. }
        ));
        assert!(matches!(
            index.search(&[], 1).unwrap_err(),
            RetrievalError::DimensionMismatch { .. }
        ));
        assert!(matches!(
            index.search(&[0.0, 0.0], 0).unwrap_err(),
            RetrievalError::InvalidQuery(_)
        ));
    }

    #[test]
    fn test_info_reflects_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 2);
        let index = VectorIndex::new(&config);

        let info = index.info();
        assert!(!info.loaded);
        assert_eq!(info.vector_count, 0);
        assert_eq!(info.index_type, "IndexFlatL2");

        index
            .build(&[vec![0.0, 0.0]], &test_recipes(1))
            .unwrap();
        let info = index.info();
        assert!(info.loaded);
        assert_eq!(info.vector_count, 1);
        assert_eq!(info.metric, "L2");
    }
}
