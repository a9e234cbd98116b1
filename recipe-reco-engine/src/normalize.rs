//! Conversion of raw backend records into canonical recipe types.
//!
//! Search endpoints deliver each recipe either as a keyed object or, for
//! older deployments, as a fixed-position array. Both shapes are accepted and
//! nothing here ever fails: unknown or missing fields fall back to empty
//! strings, zero, or empty lists.

use crate::client::RawDetail;
use crate::recipe::{EnrichedDetail, Ingredient, RecipeId, RecipeSummary};
use serde_json::{Map, Value};

/// Thumbnail used when a record carries no image.
pub const PLACEHOLDER_THUMBNAIL: &str = "/images/recipe-placeholder.png";

// Positions in the legacy array shape. Older deployments appended the
// description after the used ingredients, so it is optional and last.
const POS_ID: usize = 0;
const POS_TITLE: usize = 1;
const POS_THUMBNAIL: usize = 2;
const POS_SERVINGS: usize = 3;
const POS_SCRAP_COUNT: usize = 4;
const POS_MATCHED_COUNT: usize = 5;
const POS_USED_INGREDIENTS: usize = 6;
const POS_DESCRIPTION: usize = 7;

const ID_KEYS: &[&str] = &["recipe_id", "id"];
const TITLE_KEYS: &[&str] = &["recipe_title", "name", "title"];
const THUMBNAIL_KEYS: &[&str] = &["recipe_thumbnail", "thumbnail_url", "image_url", "thumbnail"];
const SERVINGS_KEYS: &[&str] = &["number_of_serving", "servings"];
const SCRAP_KEYS: &[&str] = &["scrap_count", "scrap"];
const MATCHED_KEYS: &[&str] = &["matched_count", "matched_ingredient_count"];
const USED_KEYS: &[&str] = &["used_ingredients", "usedIngredients"];
const DESCRIPTION_KEYS: &[&str] = &["cooking_introduction", "description"];

const MATERIAL_NAME_KEYS: &[&str] = &["material_name", "name"];
const MATERIAL_AMOUNT_KEYS: &[&str] = &["material_amount", "amount"];
const MATERIAL_UNIT_KEYS: &[&str] = &["material_unit", "unit"];

/// Wire shape of a raw recipe record.
#[derive(Clone, Copy)]
enum RawShape<'a> {
    Positional(&'a [Value]),
    Keyed(Option<&'a Map<String, Value>>),
}

impl<'a> RawShape<'a> {
    fn of(raw: &'a Value) -> Self {
        match raw {
            Value::Array(items) => RawShape::Positional(items),
            Value::Object(map) => RawShape::Keyed(Some(map)),
            _ => RawShape::Keyed(None),
        }
    }

    fn field(self, position: usize, keys: &[&str]) -> Option<&'a Value> {
        match self {
            RawShape::Positional(items) => items.get(position).filter(|v| !v.is_null()),
            RawShape::Keyed(Some(map)) => first_present(map, keys),
            RawShape::Keyed(None) => None,
        }
    }
}

/// Normalizes one raw search record into a [`RecipeSummary`].
pub fn normalize(raw: &Value) -> RecipeSummary {
    let shape = RawShape::of(raw);

    let thumbnail_url = text(shape.field(POS_THUMBNAIL, THUMBNAIL_KEYS));
    let description = text(shape.field(POS_DESCRIPTION, DESCRIPTION_KEYS));

    RecipeSummary {
        id: RecipeId::new(text(shape.field(POS_ID, ID_KEYS))),
        title: text(shape.field(POS_TITLE, TITLE_KEYS)),
        thumbnail_url: if thumbnail_url.is_empty() {
            PLACEHOLDER_THUMBNAIL.to_string()
        } else {
            thumbnail_url
        },
        servings: text(shape.field(POS_SERVINGS, SERVINGS_KEYS)),
        scrap_count: count(shape.field(POS_SCRAP_COUNT, SCRAP_KEYS)),
        matched_ingredient_count: shape
            .field(POS_MATCHED_COUNT, MATCHED_KEYS)
            .map(|v| u32::try_from(count(Some(v))).unwrap_or(u32::MAX)),
        used_ingredients: names(shape.field(POS_USED_INGREDIENTS, USED_KEYS)),
        description: (!description.is_empty()).then_some(description),
    }
}

/// Normalizes a detail endpoint response for `id`.
pub fn normalize_detail(id: &RecipeId, raw: &RawDetail) -> EnrichedDetail {
    EnrichedDetail {
        id: id.clone(),
        full_ingredient_list: raw.materials.iter().filter_map(material).collect(),
        servings: text(Some(&raw.number_of_serving)),
        scrap_count: count(Some(&raw.scrap_count)),
        title: text(Some(&raw.recipe_title)),
        description: text(Some(&raw.cooking_introduction)),
    }
}

fn material(raw: &Value) -> Option<Ingredient> {
    let ingredient = match raw {
        Value::String(name) => Ingredient::named(name.trim()),
        Value::Array(items) => Ingredient {
            name: text(items.first()),
            amount: text(items.get(1)),
            unit: text(items.get(2)),
        },
        Value::Object(map) => Ingredient {
            name: text(first_present(map, MATERIAL_NAME_KEYS)),
            amount: text(first_present(map, MATERIAL_AMOUNT_KEYS)),
            unit: text(first_present(map, MATERIAL_UNIT_KEYS)),
        },
        _ => return None,
    };
    (!ingredient.name.is_empty()).then_some(ingredient)
}

fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            // Thousands separators only; anything else must parse as a number.
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
                .collect();
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(text(first_present(map, MATERIAL_NAME_KEYS))),
                Value::Array(parts) => Some(text(parts.first())),
                other => Some(text(Some(other))),
            })
            .filter(|name| !name.is_empty())
            .collect(),
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyed_record_prefers_primary_aliases() {
        let raw = json!({
            "recipe_id": 7012,
            "recipe_title": "Potato pancake",
            "name": "ignored",
            "recipe_thumbnail": "https://img/7012.jpg",
            "number_of_serving": "2 servings",
            "scrap_count": "1,204",
            "matched_count": 3,
            "used_ingredients": ["potato", {"name": "onion"}, ""],
            "cooking_introduction": "Crispy."
        });

        let summary = normalize(&raw);
        assert_eq!(summary.id.as_str(), "7012");
        assert_eq!(summary.title, "Potato pancake");
        assert_eq!(summary.thumbnail_url, "https://img/7012.jpg");
        assert_eq!(summary.servings, "2 servings");
        assert_eq!(summary.scrap_count, 1204);
        assert_eq!(summary.matched_ingredient_count, Some(3));
        assert_eq!(summary.used_ingredients, vec!["potato", "onion"]);
        assert_eq!(summary.description.as_deref(), Some("Crispy."));
    }

    #[test]
    fn test_numeric_strings_keep_their_value() {
        let scrap = |value: Value| normalize(&json!({ "recipe_id": "x", "scrap_count": value })).scrap_count;

        assert_eq!(scrap(json!("1,204")), 1204);
        assert_eq!(scrap(json!(" 42 ")), 42);
        assert_eq!(scrap(json!("3.5")), 3);
        assert_eq!(scrap(json!("12.0")), 12);
        assert_eq!(scrap(json!("-2")), 0);
        assert_eq!(scrap(json!("1.2k")), 0);
        assert_eq!(scrap(json!("NaN")), 0);
        assert_eq!(scrap(json!(-7)), 0);
    }

    #[test]
    fn test_keyed_record_falls_back_to_secondary_aliases() {
        let raw = json!({ "id": "abc", "name": "Stew", "recipe_title": null });

        let summary = normalize(&raw);
        assert_eq!(summary.id.as_str(), "abc");
        assert_eq!(summary.title, "Stew");
        assert_eq!(summary.thumbnail_url, PLACEHOLDER_THUMBNAIL);
        assert_eq!(summary.matched_ingredient_count, None);
        assert!(summary.used_ingredients.is_empty());
        assert_eq!(summary.description, None);
    }

    #[test]
    fn test_positional_record() {
        let raw = json!([11, "Onion soup", null, "4", 9, 2, "onion, butter"]);

        let summary = normalize(&raw);
        assert_eq!(summary.id.as_str(), "11");
        assert_eq!(summary.title, "Onion soup");
        assert_eq!(summary.thumbnail_url, PLACEHOLDER_THUMBNAIL);
        assert_eq!(summary.servings, "4");
        assert_eq!(summary.scrap_count, 9);
        assert_eq!(summary.matched_ingredient_count, Some(2));
        assert_eq!(summary.used_ingredients, vec!["onion", "butter"]);
        assert_eq!(summary.description, None);

        let described = normalize(&json!([12, "Leek soup", null, "2", 0, 1, ["leek"], "Mild."]));
        assert_eq!(described.used_ingredients, vec!["leek"]);
        assert_eq!(described.description.as_deref(), Some("Mild."));
    }

    #[test]
    fn test_malformed_records_never_fail() {
        for raw in [json!(null), json!(42), json!("recipe"), json!([]), json!({})] {
            let summary = normalize(&raw);
            assert!(summary.id.is_empty());
            assert_eq!(summary.scrap_count, 0);
            assert_eq!(summary.thumbnail_url, PLACEHOLDER_THUMBNAIL);
        }
    }

    #[test]
    fn test_detail_materials_in_mixed_shapes() {
        let raw: RawDetail = serde_json::from_value(json!({
            "materials": [
                {"material_name": "carrot", "material_amount": 2, "material_unit": "ea"},
                ["salt", "1", "tsp"],
                "water",
                {"amount": "1"},
                17
            ],
            "recipe_title": "Carrot soup",
            "number_of_serving": 2,
            "scrap_count": 15,
            "cooking_introduction": "Simple soup"
        }))
        .unwrap();

        let detail = normalize_detail(&RecipeId::from("5"), &raw);
        assert_eq!(detail.id.as_str(), "5");
        assert_eq!(detail.title, "Carrot soup");
        assert_eq!(detail.servings, "2");
        assert_eq!(detail.scrap_count, 15);
        let names: Vec<_> = detail.full_ingredient_list.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["carrot", "salt", "water"]);
        assert_eq!(detail.full_ingredient_list[0].amount, "2");
        assert_eq!(detail.full_ingredient_list[1].unit, "tsp");
    }
}
