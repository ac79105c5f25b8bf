//! Ingredient containment matching
//!
//! The deterministic string path: each user ingredient is checked for
//! case-insensitive containment in the recipe's raw ingredients text.

use crate::recipe::{MatchedRecipe, Recipe};

/// The user ingredients found in the recipe's ingredient text
pub fn matching_ingredients(recipe: &Recipe, user_ingredients: &[String]) -> Vec<String> {
    let haystack = recipe.ingredients_raw.to_lowercase();
    user_ingredients
        .iter()
        .filter(|ingredient| haystack.contains(&ingredient.to_lowercase()))
        .cloned()
        .collect()
}

/// Rank recipes by ingredient match count, best first
///
/// Recipes with no matches are dropped. The sort is stable, so equal
/// counts preserve corpus order.
pub fn rank_by_matches(recipes: &[Recipe], user_ingredients: &[String]) -> Vec<MatchedRecipe> {
    let mut results: Vec<MatchedRecipe> = recipes
        .iter()
        .filter_map(|recipe| {
            let found = matching_ingredients(recipe, user_ingredients);
            if found.is_empty() {
                return None;
            }
            Some(MatchedRecipe {
                recipe: recipe.clone(),
                matching_count: found.len(),
                matching_ingredients: found,
            })
        })
        .collect();

    results.sort_by(|a, b| b.matching_count.cmp(&a.matching_count));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(title: &str, ingredients_raw: &str) -> Recipe {
        Recipe {
            title: title.to_string(),
            ingredients_raw: ingredients_raw.to_string(),
            instructions: None,
            image_name: title.to_lowercase().replace(' ', "-"),
            cleaned_ingredients: ingredients_raw.to_string(),
        }
    }

    fn ingredients(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let r = recipe("Egg Toast", "['2 Eggs', '1 slice Bread']");
        let found = matching_ingredients(&r, &ingredients(&["EGG", "bread"]));
        assert_eq!(found, vec!["EGG".to_string(), "bread".to_string()]);
    }

    #[test]
    fn test_matching_preserves_query_spelling() {
        let r = recipe("Egg Toast", "['2 eggs']");
        let found = matching_ingredients(&r, &ingredients(&["Egg"]));
        // The returned entry is the caller's token, not the recipe's text
        assert_eq!(found, vec!["Egg".to_string()]);
    }

    #[test]
    fn test_no_match_yields_empty() {
        let r = recipe("Egg Toast", "['2 eggs']");
        assert!(matching_ingredients(&r, &ingredients(&["tofu"])).is_empty());
    }

    #[test]
    fn test_rank_sorts_by_count_descending() {
        let recipes = vec![
            recipe("One Match", "['egg']"),
            recipe("Two Matches", "['egg', 'bread']"),
            recipe("No Match", "['tofu']"),
        ];
        let ranked = rank_by_matches(&recipes, &ingredients(&["egg", "bread"]));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].recipe.title, "Two Matches");
        assert_eq!(ranked[0].matching_count, 2);
        assert_eq!(ranked[1].recipe.title, "One Match");
        assert_eq!(ranked[1].matching_count, 1);
    }

    #[test]
    fn test_rank_ties_preserve_corpus_order() {
        let recipes = vec![
            recipe("First", "['egg', 'milk']"),
            recipe("Second", "['egg', 'butter']"),
            recipe("Third", "['egg']"),
        ];
        let ranked = rank_by_matches(&recipes, &ingredients(&["egg"]));
        let titles: Vec<&str> = ranked.iter().map(|m| m.recipe.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_rank_drops_zero_match_recipes() {
        let recipes = vec![recipe("No Match", "['tofu']")];
        assert!(rank_by_matches(&recipes, &ingredients(&["egg"])).is_empty());
    }
}
