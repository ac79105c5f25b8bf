//! Text preparation for embedding
//!
//! Corpus recipes and ingredient queries are rendered into the same
//! semantic space: a recipe becomes "title, ingredients, truncated
//! instructions", and an ingredient query becomes a short natural
//! language sentence. Free-text queries are encoded verbatim.

use crate::recipe::Recipe;

/// Instructions longer than this many whitespace tokens are cut
const MAX_INSTRUCTION_WORDS: usize = 500;

/// Combine recipe fields into a single text for embedding
///
/// Order matters: title first, then cleaned ingredients with the
/// list-literal punctuation stripped, then instructions truncated to
/// the first 500 words with a `...` marker when cut.
pub fn prepare_recipe_text(recipe: &Recipe) -> String {
    let mut parts = vec![recipe.title.clone()];

    let ingredients_clean: String = recipe
        .cleaned_ingredients
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '\''))
        .collect();
    parts.push(format!("Ingredients: {}", ingredients_clean));

    if let Some(instructions) = &recipe.instructions {
        parts.push(format!(
            "Instructions: {}",
            truncate_words(instructions, MAX_INSTRUCTION_WORDS)
        ));
    }

    parts.join(" ")
}

/// Synthesize query text for ingredient-based search
pub fn ingredient_query(ingredients: &[String]) -> String {
    format!("Recipe with ingredients: {}", ingredients.join(", "))
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    let mut truncated = words[..max_words].join(" ");
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(instructions: Option<&str>) -> Recipe {
        Recipe {
            title: "Egg Toast".to_string(),
            ingredients_raw: "['2 eggs', '1 slice bread']".to_string(),
            instructions: instructions.map(|s| s.to_string()),
            image_name: "egg-toast".to_string(),
            cleaned_ingredients: "['egg', 'bread']".to_string(),
        }
    }

    #[test]
    fn test_prepare_strips_list_punctuation() {
        let text = prepare_recipe_text(&recipe(None));
        assert_eq!(text, "Egg Toast Ingredients: egg, bread");
    }

    #[test]
    fn test_prepare_includes_instructions() {
        let text = prepare_recipe_text(&recipe(Some("Fry the eggs.")));
        assert_eq!(
            text,
            "Egg Toast Ingredients: egg, bread Instructions: Fry the eggs."
        );
    }

    #[test]
    fn test_prepare_truncates_long_instructions() {
        let long = vec!["word"; 600].join(" ");
        let text = prepare_recipe_text(&recipe(Some(&long)));

        assert!(text.ends_with("..."));
        let instructions = text.split("Instructions: ").nth(1).unwrap();
        let word_count = instructions.trim_end_matches("...").split_whitespace().count();
        assert_eq!(word_count, 500);
    }

    #[test]
    fn test_prepare_keeps_short_instructions_intact() {
        let short = vec!["word"; 500].join(" ");
        let text = prepare_recipe_text(&recipe(Some(&short)));
        assert!(!text.ends_with("..."));
    }

    #[test]
    fn test_ingredient_query_shape() {
        let query = ingredient_query(&[
            "egg".to_string(),
            "bread".to_string(),
            "butter".to_string(),
        ]);
        assert_eq!(query, "Recipe with ingredients: egg, bread, butter");
    }
}
