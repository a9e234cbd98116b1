//! Throttled, single-flight enrichment of recipe summaries with details.
//!
//! [`BatchFetcher`] takes a list of recipe IDs, skips the ones already in the
//! [`EnrichmentCache`], and fetches the rest in fixed-size chunks: every
//! request of a chunk runs concurrently, chunks run one after another with a
//! fixed pause in between. Only one batch runs at a time; a call made while a
//! batch is active is dropped, not queued.

use crate::client::RawDetail;
use crate::error::Result;
use crate::normalize::normalize_detail;
use crate::recipe::{EnrichedDetail, RecipeId};
use async_trait::async_trait;
use chrono::Duration;
use dashmap::DashMap;
use futures::future::join_all;
use getset::{CopyGetters, Getters};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Source of per-recipe detail records.
#[async_trait]
pub trait RecipeDetailSource: Send + Sync {
    async fn fetch_detail(&self, id: &RecipeId) -> Result<RawDetail>;
}

#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Maximum number of detail requests in flight at once
    pub chunk_size: usize,
    /// Pause between the end of one chunk and the start of the next
    pub chunk_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3,
            chunk_delay: Duration::milliseconds(200),
        }
    }
}

impl BatchConfig {
    pub fn new(chunk_size: usize, chunk_delay: Duration) -> Self {
        Self {
            chunk_size,
            chunk_delay,
        }
    }
}

/// Additive store of fetched details, keyed by recipe ID.
///
/// Every merge bumps a revision counter that subscribers can watch to know
/// when to re-render.
pub struct EnrichmentCache {
    details: DashMap<RecipeId, EnrichedDetail>,
    revision: watch::Sender<u64>,
}

impl Default for EnrichmentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrichmentCache {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            details: DashMap::new(),
            revision,
        }
    }

    pub fn get(&self, id: &RecipeId) -> Option<EnrichedDetail> {
        self.details.get(id).map(|detail| detail.value().clone())
    }

    pub fn contains(&self, id: &RecipeId) -> bool {
        self.details.contains_key(id)
    }

    /// IDs from `ids` with no cached detail, first occurrence order, no repeats.
    pub fn missing(&self, ids: &[RecipeId]) -> Vec<RecipeId> {
        let mut seen = HashSet::new();
        ids.iter()
            .filter(|id| !id.is_empty() && !self.contains(id))
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Adds `details` and returns how many were merged.
    pub fn merge(&self, details: Vec<EnrichedDetail>) -> usize {
        let merged = details.len();
        if merged == 0 {
            return 0;
        }
        for detail in details {
            self.details.insert(detail.id.clone(), detail);
        }
        self.revision.send_modify(|revision| *revision += 1);
        merged
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// Why a batch request did not start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EnrichmentSkipped {
    #[error("every requested recipe is already enriched")]
    NothingMissing,
    #[error("an enrichment batch is already running")]
    AlreadyRunning,
    #[error("enrichment has been shut down")]
    Closed,
}

/// Result of one batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Getters, CopyGetters)]
pub struct BatchReport {
    #[getset(get_copy = "pub")]
    requested: usize,
    #[getset(get_copy = "pub")]
    enriched: usize,
    #[getset(get_copy = "pub")]
    chunks: usize,
    #[getset(get = "pub")]
    failed: Vec<RecipeId>,
    #[getset(get_copy = "pub")]
    cancelled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Completed(BatchReport),
    Skipped(EnrichmentSkipped),
}

struct FetcherState {
    cache: Arc<EnrichmentCache>,
    source: Arc<dyn RecipeDetailSource>,
    config: BatchConfig,
    active: AtomicBool,
    closed: AtomicBool,
}

#[derive(Clone)]
pub struct BatchFetcher {
    state: Arc<FetcherState>,
}

impl BatchFetcher {
    pub fn new(
        cache: Arc<EnrichmentCache>,
        source: Arc<dyn RecipeDetailSource>,
        config: BatchConfig,
    ) -> Self {
        Self {
            state: Arc::new(FetcherState {
                cache,
                source,
                config,
                active: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<EnrichmentCache> {
        &self.state.cache
    }

    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::Acquire)
    }

    /// Claims the single-flight slot for the IDs of `ids` that still need a
    /// detail. The slot is released when the returned run is dropped.
    pub fn try_start(&self, ids: &[RecipeId]) -> std::result::Result<BatchRun, EnrichmentSkipped> {
        if self.state.closed.load(Ordering::Acquire) {
            return Err(EnrichmentSkipped::Closed);
        }

        let missing = self.state.cache.missing(ids);
        if missing.is_empty() {
            return Err(EnrichmentSkipped::NothingMissing);
        }

        if self
            .state
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Enrichment batch already running, dropping request for {} recipes", missing.len());
            return Err(EnrichmentSkipped::AlreadyRunning);
        }

        Ok(BatchRun {
            state: self.state.clone(),
            missing,
        })
    }

    /// Starts a batch for `ids` and waits for it to finish.
    pub async fn fetch(&self, ids: &[RecipeId]) -> EnrichmentOutcome {
        match self.try_start(ids) {
            Ok(run) => EnrichmentOutcome::Completed(run.execute().await),
            Err(skipped) => EnrichmentOutcome::Skipped(skipped),
        }
    }

    /// Stops any running batch before its next chunk and refuses new ones.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::Release);
    }
}

/// A claimed batch; holds the single-flight slot until dropped.
pub struct BatchRun {
    state: Arc<FetcherState>,
    missing: Vec<RecipeId>,
}

impl BatchRun {
    pub fn ids(&self) -> &[RecipeId] {
        &self.missing
    }

    pub async fn execute(self) -> BatchReport {
        let state = &self.state;
        let chunk_size = state.config.chunk_size.max(1);
        let delay = state.config.chunk_delay.to_std().unwrap_or_default();
        let chunk_count = self.missing.len().div_ceil(chunk_size);

        let mut report = BatchReport {
            requested: self.missing.len(),
            ..Default::default()
        };

        for (index, chunk) in self.missing.chunks(chunk_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(delay).await;
            }
            if state.closed.load(Ordering::Acquire) {
                report.cancelled = true;
                break;
            }

            log::debug!("Fetching enrichment chunk {}/{} ({} recipes)", index + 1, chunk_count, chunk.len());
            let results = join_all(chunk.iter().map(|id| state.source.fetch_detail(id))).await;

            let mut details = Vec::with_capacity(chunk.len());
            for (id, result) in chunk.iter().zip(results) {
                match result {
                    Ok(raw) => details.push(normalize_detail(id, &raw)),
                    Err(e) => {
                        log::warn!("Failed to fetch detail for recipe {}: {}", id, e);
                        report.failed.push(id.clone());
                    }
                }
            }

            // Results that arrive after shutdown are dropped.
            if state.closed.load(Ordering::Acquire) {
                report.cancelled = true;
                break;
            }
            report.enriched += state.cache.merge(details);
            report.chunks += 1;
        }

        log::debug!(
            "Enrichment batch finished: {} of {} enriched, {} failed",
            report.enriched,
            report.requested,
            report.failed.len()
        );
        report
    }
}

impl Drop for BatchRun {
    fn drop(&mut self) {
        self.state.active.store(false, Ordering::Release);
    }
}
