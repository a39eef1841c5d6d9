//! Recipe resolver.
//!
//! The dataset is bundled at compile time, parsed and validated once at
//! startup, and read-only afterwards, so it is safely consultable from any
//! thread without synchronization.

use crate::model::RecipeRecord;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;

const DATASET: &str = include_str!("../data/recipes.json");

pub struct RecipeBook {
    records: HashMap<String, RecipeRecord>,
}

impl RecipeBook {
    /// Load the bundled dataset.
    pub fn load() -> Result<Self> {
        Self::from_json(DATASET).context("parse bundled recipe dataset")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: HashMap<String, RecipeRecord> = serde_json::from_str(json)?;
        for (label, record) in &records {
            if record.ingredients.is_empty() {
                bail!("recipe for {label:?} has no ingredients");
            }
            if record.instructions.is_empty() {
                bail!("recipe for {label:?} has no instructions");
            }
            if record.servings == 0 {
                bail!("recipe for {label:?} serves nobody");
            }
        }
        Ok(Self { records })
    }

    /// Exact-match lookup by dish label. Case- and whitespace-sensitive;
    /// a miss is an expected outcome, not a failure.
    pub fn resolve(&self, label: &str) -> Option<&RecipeRecord> {
        self.records.get(label)
    }

    /// All dish labels with a bundled recipe, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.records.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_dish() {
        let book = RecipeBook::load().unwrap();
        let recipe = book.resolve("Egusi Soup").expect("Egusi Soup is bundled");
        assert!(!recipe.ingredients.is_empty());
        assert!(!recipe.instructions.is_empty());
        assert!(recipe.servings > 0);
    }

    #[test]
    fn unknown_dish_is_a_miss() {
        let book = RecipeBook::load().unwrap();
        assert!(book.resolve("Nonexistent Dish").is_none());
    }

    #[test]
    fn lookup_is_exact_match_only() {
        let book = RecipeBook::load().unwrap();
        assert!(book.resolve("jollof rice").is_none());
        assert!(book.resolve(" Jollof Rice").is_none());
        assert!(book.resolve("Jollof Rice").is_some());
    }

    #[test]
    fn labels_are_sorted() {
        let book = RecipeBook::load().unwrap();
        let labels = book.labels();
        assert!(!labels.is_empty());
        let mut sorted = labels.clone();
        sorted.sort_unstable();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn rejects_empty_ingredient_list() {
        let json = r#"{"Test Dish":{"cookTime":"5 min","servings":1,"ingredients":[],"instructions":["stir"]}}"#;
        assert!(RecipeBook::from_json(json).is_err());
    }

    #[test]
    fn rejects_zero_servings() {
        let json = r#"{"Test Dish":{"cookTime":"5 min","servings":0,"ingredients":["water"],"instructions":["stir"]}}"#;
        assert!(RecipeBook::from_json(json).is_err());
    }
}
