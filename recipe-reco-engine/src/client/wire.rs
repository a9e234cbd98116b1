use crate::query::{IngredientQuery, KeywordMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page as returned by either search endpoint.
///
/// The combination search fills `combination_number` and
/// `has_more_combinations`; the keyword search fills `page`. Recipes stay raw
/// until the normalizer sees them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub recipes: Vec<Value>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub combination_number: Option<u32>,
    #[serde(default)]
    pub has_more_combinations: Option<bool>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl RawPage {
    pub fn from_recipes(recipes: Vec<Value>) -> Self {
        Self {
            total: Some(recipes.len() as u64),
            recipes,
            ..Default::default()
        }
    }
}

/// Detail endpoint response. Every field is kept loosely typed; the
/// normalizer decides how to read it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetail {
    #[serde(default)]
    pub materials: Vec<Value>,
    #[serde(default)]
    pub recipe_title: Value,
    #[serde(default)]
    pub number_of_serving: Value,
    #[serde(default)]
    pub scrap_count: Value,
    #[serde(default)]
    pub cooking_introduction: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct CombinationRequest<'a> {
    pub ingredients: &'a [IngredientQuery],
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeywordRequest<'a> {
    pub keyword: &'a str,
    pub page: u32,
    pub size: u32,
    pub method: KeywordMethod,
}

#[derive(Debug, Serialize)]
pub(crate) struct DetailRequest<'a> {
    pub recipe_id: &'a str,
}
