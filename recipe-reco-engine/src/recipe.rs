use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable backend identifier of a recipe.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(String);

impl RecipeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecipeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lightweight recipe record as returned by the search endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    pub thumbnail_url: String,
    pub servings: String,
    pub scrap_count: u64,
    /// Only set in ingredient-combination mode.
    pub matched_ingredient_count: Option<u32>,
    pub used_ingredients: Vec<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
    pub unit: String,
}

impl Ingredient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Heavier per-recipe record fetched from the detail endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDetail {
    pub id: RecipeId,
    pub full_ingredient_list: Vec<Ingredient>,
    pub servings: String,
    pub scrap_count: u64,
    pub title: String,
    pub description: String,
}

/// Display model: a summary with any known detail merged over it.
///
/// Built at read time; neither input is modified.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecipeCard {
    pub id: RecipeId,
    pub title: String,
    pub thumbnail_url: String,
    pub servings: String,
    pub scrap_count: u64,
    pub matched_ingredient_count: Option<u32>,
    pub ingredients: Vec<Ingredient>,
    pub description: Option<String>,
    pub enriched: bool,
}

impl RecipeCard {
    pub fn merge(summary: &RecipeSummary, detail: Option<&EnrichedDetail>) -> Self {
        let mut card = Self {
            id: summary.id.clone(),
            title: summary.title.clone(),
            thumbnail_url: summary.thumbnail_url.clone(),
            servings: summary.servings.clone(),
            scrap_count: summary.scrap_count,
            matched_ingredient_count: summary.matched_ingredient_count,
            ingredients: summary
                .used_ingredients
                .iter()
                .map(Ingredient::named)
                .collect(),
            description: summary.description.clone(),
            enriched: false,
        };

        let Some(detail) = detail else {
            return card;
        };

        card.enriched = true;
        if !detail.title.is_empty() {
            card.title = detail.title.clone();
        }
        if !detail.servings.is_empty() {
            card.servings = detail.servings.clone();
        }
        // Scrap counts only grow; a zero in the detail means "absent".
        if detail.scrap_count > 0 {
            card.scrap_count = detail.scrap_count;
        }
        if !detail.full_ingredient_list.is_empty() {
            card.ingredients = detail.full_ingredient_list.clone();
        }
        if !detail.description.is_empty() {
            card.description = Some(detail.description.clone());
        }
        card
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RecipeSummary {
        RecipeSummary {
            id: "42".into(),
            title: "Carrot soup".to_string(),
            thumbnail_url: "thumb.png".to_string(),
            servings: String::new(),
            scrap_count: 3,
            matched_ingredient_count: Some(2),
            used_ingredients: vec!["carrot".to_string(), "onion".to_string()],
            description: None,
        }
    }

    #[test]
    fn test_card_without_detail_uses_summary_fields() {
        let card = RecipeCard::merge(&summary(), None);
        assert!(!card.enriched);
        assert_eq!(card.title, "Carrot soup");
        assert_eq!(card.ingredients.len(), 2);
        assert_eq!(card.ingredients[0], Ingredient::named("carrot"));
        assert_eq!(card.matched_ingredient_count, Some(2));
    }

    #[test]
    fn test_detail_supersedes_non_empty_fields() {
        let summary = summary();
        let detail = EnrichedDetail {
            id: "42".into(),
            full_ingredient_list: vec![Ingredient {
                name: "carrot".to_string(),
                amount: "2".to_string(),
                unit: "ea".to_string(),
            }],
            servings: "2 servings".to_string(),
            scrap_count: 0,
            title: String::new(),
            description: "Warm and sweet".to_string(),
        };

        let card = RecipeCard::merge(&summary, Some(&detail));
        assert!(card.enriched);
        assert_eq!(card.title, "Carrot soup");
        assert_eq!(card.servings, "2 servings");
        assert_eq!(card.scrap_count, 3);
        assert_eq!(card.ingredients, detail.full_ingredient_list);
        assert_eq!(card.description.as_deref(), Some("Warm and sweet"));
        // The summary is untouched.
        assert_eq!(summary.servings, "");
    }
}
