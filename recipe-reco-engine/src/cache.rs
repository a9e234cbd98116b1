use crate::query::{SearchMode, SearchQuery};
use crate::recipe::{RecipeId, RecipeSummary};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Cache key for one page of one recommendation query.
///
/// Rendered as `<mode>:<sha256 of normalized query>:<page>`, so equal
/// queries always yield equal keys regardless of ingredient order.
#[derive(Hash, Eq, PartialEq, Clone, Debug, Getters, CopyGetters)]
pub struct CacheKey {
    #[getset(get_copy = "pub")]
    mode: SearchMode,
    #[getset(get_copy = "pub")]
    page: u32,
    #[getset(get = "pub")]
    key: String,
}

impl CacheKey {
    pub fn new(query: &SearchQuery, page: u32) -> Self {
        let mode = query.mode();
        let mut hasher = Sha256::new();
        hasher.update(query.normalized().as_bytes());
        let digest = hex::encode(hasher.finalize());

        Self {
            mode,
            page,
            key: format!("{}:{}:{}", mode, digest, page),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// A fully resolved, deduplicated page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub recipes: Vec<RecipeSummary>,
    pub combination_number: u32,
    pub has_more_combinations: bool,
    pub total: u64,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn recipe_ids(&self) -> Vec<RecipeId> {
        self.recipes.iter().map(|recipe| recipe.id.clone()).collect()
    }
}

/// Session-scoped page cache. Entries never expire; the whole cache is
/// cleared when the session is reset.
#[derive(Default)]
pub struct CombinationCache {
    cache: DashMap<CacheKey, CacheEntry>,
}

impl CombinationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored entry exactly as it was put.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.cache.get(key) {
            Some(entry) => {
                log::debug!("Cache hit for key: {}", key);
                Some(entry.value().clone())
            }
            None => {
                log::debug!("Cache miss for key: {}", key);
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, entry: CacheEntry) {
        log::debug!(
            "Stored {} recipes in cache with key: {}",
            entry.recipes.len(),
            key
        );
        self.cache.insert(key, entry);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
        log::info!("Combination cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached_pages: self.cache.len(),
            cached_recipes: self
                .cache
                .iter()
                .map(|entry| entry.value().recipes.len())
                .sum(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub cached_pages: usize,
    pub cached_recipes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{IngredientQuery, KeywordMethod};

    fn entry(ids: &[&str]) -> CacheEntry {
        CacheEntry {
            recipes: ids
                .iter()
                .map(|id| RecipeSummary {
                    id: (*id).into(),
                    ..Default::default()
                })
                .collect(),
            combination_number: 1,
            has_more_combinations: true,
            total: ids.len() as u64,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_cache_key_generation() {
        let query = SearchQuery::ingredients([
            IngredientQuery::new("carrot", 1.0, "ea"),
            IngredientQuery::new("potato", 2.0, "ea"),
        ]);
        let reordered = SearchQuery::ingredients([
            IngredientQuery::new("potato", 2.0, "ea"),
            IngredientQuery::new("carrot", 1.0, "ea"),
        ]);

        let key1 = CacheKey::new(&query, 1);
        let key2 = CacheKey::new(&reordered, 1);
        assert_eq!(key1, key2);
        assert_eq!(key1.as_str(), key2.as_str());
        assert!(key1.as_str().starts_with("ingredient-combination:"));
        assert!(key1.as_str().ends_with(":1"));

        // Different page should produce different key
        assert_ne!(key1, CacheKey::new(&query, 2));

        // Different mode should produce different key
        let keyword = CacheKey::new(&SearchQuery::keyword("carrot", KeywordMethod::Recipe), 1);
        assert_eq!(keyword.mode(), SearchMode::Keyword);
        assert_ne!(key1, keyword);
    }

    #[test]
    fn test_get_returns_stored_entry_unchanged() {
        let cache = CombinationCache::new();
        let key = CacheKey::new(&SearchQuery::keyword("stew", KeywordMethod::Recipe), 1);
        assert!(cache.get(&key).is_none());

        let stored = entry(&["A", "B"]);
        cache.put(key.clone(), stored.clone());

        assert_eq!(cache.get(&key), Some(stored));
        assert_eq!(
            cache.stats(),
            CacheStats {
                cached_pages: 1,
                cached_recipes: 2
            }
        );

        cache.clear();
        assert!(cache.is_empty());
    }
}
