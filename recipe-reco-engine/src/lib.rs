pub mod cache;
pub mod client;
pub mod deduplication;
pub mod enrichment;
mod error;
pub mod normalize;
pub mod query;
pub mod recipe;
pub mod seen;


use cache::CombinationCache;
use chrono::Utc;
use deduplication::RequestDeduplicator;
use enrichment::BatchFetcher;
use futures::Future;
use normalize::normalize;
use seen::SeenRegistry;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

pub use cache::{CacheEntry, CacheKey, CacheStats};
pub use client::{ApiConfig, RawDetail, RawPage, RecipeApiClient};
pub use deduplication::DeduplicationConfig;
pub use enrichment::{
    BatchConfig, BatchReport, EnrichmentCache, EnrichmentOutcome, EnrichmentSkipped,
    RecipeDetailSource,
};
pub use error::{Error, Result};
pub use query::{IngredientQuery, KeywordMethod, SearchMode, SearchQuery};
pub use recipe::{EnrichedDetail, Ingredient, RecipeCard, RecipeId, RecipeSummary};
pub use seen::DedupPolicy;

/// Settings for one recommendation session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub dedup_policy: DedupPolicy,
    /// Page size the keyword search was asked for; used to derive
    /// `has_more_combinations` when the response does not carry it
    pub keyword_page_size: u32,
    pub batch: BatchConfig,
    pub deduplication: DeduplicationConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dedup_policy: DedupPolicy::PerPage,
            keyword_page_size: 20,
            batch: BatchConfig::default(),
            deduplication: DeduplicationConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Single-shot flows: one dedup partition for the whole session.
    pub fn global() -> Self {
        Self {
            dedup_policy: DedupPolicy::Global,
            ..Default::default()
        }
    }

    /// Combination switching: one dedup partition per page.
    pub fn per_page() -> Self {
        Self::default()
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }
}

/// Point-in-time view of a session's caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct SessionStats {
    pub cached_pages: usize,
    pub cached_recipes: usize,
    pub seen_partitions: usize,
    pub seen_recipes: usize,
    pub enriched_recipes: usize,
    pub enrichment_active: bool,
    pub generation: u64,
}

/// Entry point for one recommendation session.
///
/// Owns the page cache and the dedup registry, and drives enrichment through
/// a shared [`EnrichmentCache`]. One instance per session; [`reset_session`]
/// starts a new top-level search on the same instance.
///
/// [`reset_session`]: PaginationController::reset_session
pub struct PaginationController {
    config: SessionConfig,
    combinations: CombinationCache,
    seen: SeenRegistry,
    deduplicator: RequestDeduplicator,
    fetcher: BatchFetcher,
    /// Session generation. Held while a page is committed and while the
    /// session is reset.
    generation: Mutex<u64>,
    closed: AtomicBool,
}

impl PaginationController {
    pub fn new(config: SessionConfig, detail_source: Arc<dyn RecipeDetailSource>) -> Self {
        Self::with_enrichment_cache(config, detail_source, Arc::new(EnrichmentCache::new()))
    }

    /// Builds a session that shares an existing enrichment cache, e.g. with
    /// earlier sessions of the same page.
    pub fn with_enrichment_cache(
        config: SessionConfig,
        detail_source: Arc<dyn RecipeDetailSource>,
        enrichment: Arc<EnrichmentCache>,
    ) -> Self {
        Self {
            combinations: CombinationCache::new(),
            seen: SeenRegistry::new(config.dedup_policy),
            deduplicator: RequestDeduplicator::new(config.deduplication.clone()),
            fetcher: BatchFetcher::new(enrichment, detail_source, config.batch.clone()),
            generation: Mutex::new(0),
            closed: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the cached entry for `key`, or fetches page `key.page()` with
    /// `fetch_raw_page`, deduplicates it and caches the result.
    ///
    /// Cache hits are returned as stored, without filtering. Fetch and parse
    /// failures are returned and leave the cache untouched. If the session is
    /// reset while the fetch is in flight, the response is discarded.
    pub async fn resolve_page<F, Fut>(&self, key: &CacheKey, fetch_raw_page: F) -> Result<CacheEntry>
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<RawPage>>,
    {
        self.ensure_open()?;
        if let Some(entry) = self.combinations.get(key) {
            return Ok(entry);
        }

        let page = key.page();
        let generation = *self.generation();

        self.deduplicator
            .execute(key, || async move {
                // Another caller may have filled the entry since the first check.
                if let Some(entry) = self.combinations.get(key) {
                    return Ok(entry);
                }

                let raw = fetch_raw_page(page)
                    .await
                    .map_err(|e| Error::page_fetch(page, e))?;

                self.commit(key, generation, raw)
            })
            .await
    }

    /// Records and caches a fetched page unless the session moved on since
    /// `generation` was read.
    fn commit(&self, key: &CacheKey, generation: u64, raw: RawPage) -> Result<CacheEntry> {
        let current = self.generation();
        self.ensure_open()?;
        if *current != generation {
            log::warn!("Dropping response for {}: session was reset mid-flight", key);
            return Err(Error::SessionReset { page: key.page() });
        }

        let entry = self.build_entry(key, raw);
        self.combinations.put(key.clone(), entry.clone());
        Ok(entry)
    }

    fn build_entry(&self, key: &CacheKey, raw: RawPage) -> CacheEntry {
        let page = key.page();
        let received = raw.recipes.len();

        let summaries: Vec<RecipeSummary> = raw
            .recipes
            .iter()
            .map(normalize)
            .filter(|summary| !summary.id.is_empty())
            .collect();
        if summaries.len() < received {
            log::warn!(
                "Skipped {} recipes without an id on page {}",
                received - summaries.len(),
                page
            );
        }

        let recipes = self.seen.filter_and_record(page, summaries);
        let total = raw.total.unwrap_or(received as u64);
        let has_more_combinations = raw.has_more_combinations.unwrap_or_else(|| match key.mode() {
            SearchMode::Keyword => u64::from(page) * u64::from(self.config.keyword_page_size) < total,
            SearchMode::IngredientCombination => false,
        });

        CacheEntry {
            recipes,
            combination_number: raw.combination_number.or(raw.page).unwrap_or(page),
            has_more_combinations,
            total,
            fetched_at: Utc::now(),
        }
    }

    /// Starts enrichment for `ids` in the background.
    ///
    /// Returns why nothing started when every ID is already enriched or a
    /// batch is running; callers re-issue on their next trigger.
    pub fn request_enrichment(
        &self,
        ids: &[RecipeId],
    ) -> std::result::Result<JoinHandle<BatchReport>, EnrichmentSkipped> {
        if self.is_closed() {
            return Err(EnrichmentSkipped::Closed);
        }
        let run = self.fetcher.try_start(ids)?;
        log::debug!("Starting enrichment for {} recipes", run.ids().len());
        Ok(tokio::spawn(run.execute()))
    }

    /// Like [`request_enrichment`](Self::request_enrichment), but waits for
    /// the batch to finish.
    pub async fn enrich(&self, ids: &[RecipeId]) -> EnrichmentOutcome {
        if self.is_closed() {
            return EnrichmentOutcome::Skipped(EnrichmentSkipped::Closed);
        }
        self.fetcher.fetch(ids).await
    }

    pub fn enrichment(&self) -> &Arc<EnrichmentCache> {
        self.fetcher.cache()
    }

    /// Receives the enrichment revision, bumped whenever new details land.
    pub fn enrichment_updates(&self) -> watch::Receiver<u64> {
        self.fetcher.cache().subscribe()
    }

    /// Merges cached details over `recipes` for display.
    pub fn cards(&self, recipes: &[RecipeSummary]) -> Vec<RecipeCard> {
        let enrichment = self.fetcher.cache();
        recipes
            .iter()
            .map(|summary| RecipeCard::merge(summary, enrichment.get(&summary.id).as_ref()))
            .collect()
    }

    /// Starts over for a new top-level search. Page cache and dedup registry
    /// are cleared; enrichment is kept since it is keyed by recipe ID.
    pub fn reset_session(&self) {
        let mut generation = self.generation();
        *generation += 1;
        self.combinations.clear();
        self.seen.reset();
        self.deduplicator.clear();
        log::info!("Recommendation session reset (generation {})", *generation);
    }

    /// Tears the session down. In-flight page fetches are discarded and a
    /// running enrichment batch stops before its next chunk.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.fetcher.close();
        self.reset_session();
        log::info!("Recommendation session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SessionStats {
        let cache = self.combinations.stats();
        SessionStats {
            cached_pages: cache.cached_pages,
            cached_recipes: cache.cached_recipes,
            seen_partitions: self.seen.partition_count(),
            seen_recipes: self.seen.seen_count(),
            enriched_recipes: self.fetcher.cache().len(),
            enrichment_active: self.fetcher.is_active(),
            generation: *self.generation(),
        }
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::SessionClosed)
        } else {
            Ok(())
        }
    }
}
