//! Recipe corpus data model
//!
//! Serde types matching the corpus JSON field names, plus validation
//! for loosely structured source records.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// A validated recipe record
///
/// Field names follow the corpus file. `ingredients_raw` and
/// `cleaned_ingredients` both hold Python-style list literals as
/// scraped; `cleaned_ingredients` drops quantities and units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Ingredients")]
    pub ingredients_raw: String,

    #[serde(rename = "Instructions", skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(rename = "Image_Name")]
    pub image_name: String,

    #[serde(rename = "Cleaned_Ingredients")]
    pub cleaned_ingredients: String,
}

/// Loosely typed corpus record, before validation
///
/// The source data has missing and null fields; every field is
/// optional here so a bad record deserializes instead of failing the
/// whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecipe {
    #[serde(rename = "Title")]
    pub title: Option<String>,

    #[serde(rename = "Ingredients")]
    pub ingredients: Option<String>,

    #[serde(rename = "Instructions")]
    pub instructions: Option<String>,

    #[serde(rename = "Image_Name")]
    pub image_name: Option<String>,

    #[serde(rename = "Cleaned_Ingredients")]
    pub cleaned_ingredients: Option<String>,
}

impl Recipe {
    /// Validate a raw record
    ///
    /// Title, Ingredients, Image_Name and Cleaned_Ingredients must be
    /// present and non-blank; Instructions is optional and blank
    /// values are normalized to `None`. Rejected records carry the
    /// offending field in the error.
    pub fn from_raw(raw: RawRecipe) -> Result<Self> {
        Ok(Self {
            title: required(raw.title, "Title")?,
            ingredients_raw: required(raw.ingredients, "Ingredients")?,
            instructions: raw.instructions.filter(|s| !s.trim().is_empty()),
            image_name: required(raw.image_name, "Image_Name")?,
            cleaned_ingredients: required(raw.cleaned_ingredients, "Cleaned_Ingredients")?,
        })
    }
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(RetrievalError::corpus(format!("{} is blank", name))),
        None => Err(RetrievalError::corpus(format!("{} is missing", name))),
    }
}

/// A recipe with ingredient-match diagnostics attached
///
/// Serialized field names (`matchingCount`, `matchingIngredients`)
/// match the response shape consumed by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,

    /// Number of query ingredients found in the recipe
    #[serde(rename = "matchingCount")]
    pub matching_count: usize,

    /// The query ingredients that were found
    #[serde(rename = "matchingIngredients")]
    pub matching_ingredients: Vec<String>,
}

/// Which retrieval path produced a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Vector,
    StringMatching,
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Vector => "vector",
            Self::StringMatching => "string_matching",
        };
        write!(f, "{}", s)
    }
}

/// Parse a Python-style list literal into a vector of strings
///
/// The corpus stores ingredient lists as `['a', 'b']`; swapping the
/// quotes makes them valid JSON. Malformed input yields an empty list
/// rather than an error.
pub fn parse_ingredient_list(raw: &str) -> Vec<String> {
    let normalized = raw.replace('\'', "\"");
    match serde_json::from_str(&normalized) {
        Ok(list) => list,
        Err(e) => {
            log::debug!("Failed to parse ingredient list {:?}: {}", raw, e);
            Vec::new()
        }
    }
}
