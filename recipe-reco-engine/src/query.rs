use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum SearchMode {
    #[strum(to_string = "ingredient-combination")]
    #[serde(rename = "ingredient-combination")]
    IngredientCombination,
    #[strum(to_string = "keyword")]
    #[serde(rename = "keyword")]
    Keyword,
}

/// What a keyword search matches against.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KeywordMethod {
    #[default]
    Recipe,
    Ingredient,
}

/// One ingredient the user owns, as sent to the combination search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientQuery {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

impl IngredientQuery {
    pub fn new(name: impl Into<String>, amount: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount,
            unit: unit.into(),
        }
    }

    fn canonical(&self) -> String {
        format!(
            "{}|{}|{}",
            collapse(&self.name),
            self.amount,
            collapse(&self.unit)
        )
    }
}

/// A top-level recommendation query.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchQuery {
    Ingredients(Vec<IngredientQuery>),
    Keyword { keyword: String, method: KeywordMethod },
}

impl SearchQuery {
    pub fn ingredients(ingredients: impl IntoIterator<Item = IngredientQuery>) -> Self {
        SearchQuery::Ingredients(ingredients.into_iter().collect())
    }

    pub fn keyword(keyword: impl Into<String>, method: KeywordMethod) -> Self {
        SearchQuery::Keyword {
            keyword: keyword.into(),
            method,
        }
    }

    pub fn mode(&self) -> SearchMode {
        match self {
            SearchQuery::Ingredients(_) => SearchMode::IngredientCombination,
            SearchQuery::Keyword { .. } => SearchMode::Keyword,
        }
    }

    /// Canonical text form. Ingredient order, letter case and surrounding
    /// whitespace do not affect the result.
    pub fn normalized(&self) -> String {
        match self {
            SearchQuery::Ingredients(ingredients) => {
                let mut parts: Vec<String> = ingredients.iter().map(IngredientQuery::canonical).collect();
                parts.sort();
                parts.join(";")
            }
            SearchQuery::Keyword { keyword, method } => format!("{}:{}", method, collapse(keyword)),
        }
    }
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").to_lowercase()
}
