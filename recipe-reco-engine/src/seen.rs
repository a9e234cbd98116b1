use crate::recipe::{RecipeId, RecipeSummary};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use strum_macros::{Display, EnumString};

/// How recipe identifiers are partitioned for cross-page deduplication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum DedupPolicy {
    /// One partition for the whole session (single-shot flows).
    Global,
    /// One partition per page (combination switching).
    #[default]
    PerPage,
}

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub enum Partition {
    Global,
    Page(u32),
}

/// Records which recipe IDs each partition has already delivered.
pub struct SeenRegistry {
    policy: DedupPolicy,
    partitions: Mutex<HashMap<Partition, HashSet<RecipeId>>>,
}

impl SeenRegistry {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            partitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    pub fn partition_for(&self, page: u32) -> Partition {
        match self.policy {
            DedupPolicy::Global => Partition::Global,
            DedupPolicy::PerPage => Partition::Page(page),
        }
    }

    /// Drops every summary already credited to another partition, then
    /// credits all of `raw` (before filtering) to the partition of `page`.
    ///
    /// Crediting the unfiltered IDs keeps a refetch of the same page stable:
    /// nothing recorded for page P is ever filtered out of page P later.
    /// Repeated IDs inside `raw` keep their first occurrence.
    pub fn filter_and_record(&self, page: u32, raw: Vec<RecipeSummary>) -> Vec<RecipeSummary> {
        let partition = self.partition_for(page);
        let mut partitions = self.lock();

        let claimed_elsewhere: HashSet<&RecipeId> = partitions
            .iter()
            .filter(|(other, _)| **other != partition)
            .flat_map(|(_, ids)| ids.iter())
            .collect();

        let mut in_page = HashSet::new();
        let mut dropped = 0;
        let mut kept = Vec::with_capacity(raw.len());
        for summary in &raw {
            if !in_page.insert(summary.id.clone()) {
                continue;
            }
            if claimed_elsewhere.contains(&summary.id) {
                dropped += 1;
                continue;
            }
            kept.push(summary.clone());
        }

        if dropped > 0 {
            log::debug!("Filtered {} recipes already shown outside {:?}", dropped, partition);
        }

        partitions.entry(partition).or_default().extend(in_page);
        kept
    }

    /// IDs credited to the partition that owns `page`.
    pub fn recorded(&self, page: u32) -> HashSet<RecipeId> {
        let partition = self.partition_for(page);
        self.lock().get(&partition).cloned().unwrap_or_default()
    }

    pub fn partition_count(&self) -> usize {
        self.lock().len()
    }

    pub fn seen_count(&self) -> usize {
        self.lock().values().map(HashSet::len).sum()
    }

    pub fn reset(&self) {
        self.lock().clear();
        log::debug!("Seen registry cleared");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Partition, HashSet<RecipeId>>> {
        self.partitions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(ids: &[&str]) -> Vec<RecipeSummary> {
        ids.iter()
            .map(|id| RecipeSummary {
                id: (*id).into(),
                ..Default::default()
            })
            .collect()
    }

    fn ids(recipes: &[RecipeSummary]) -> Vec<&str> {
        recipes.iter().map(|r| r.id.as_str()).collect()
    }

    fn set(ids: &[&str]) -> HashSet<RecipeId> {
        ids.iter().map(|id| RecipeId::from(*id)).collect()
    }

    #[test]
    fn test_per_page_filters_against_other_pages_and_records_raw_ids() {
        let registry = SeenRegistry::new(DedupPolicy::PerPage);

        let page1 = registry.filter_and_record(1, summaries(&["A", "B", "C", "D", "E"]));
        assert_eq!(ids(&page1), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(registry.recorded(1), set(&["A", "B", "C", "D", "E"]));

        let page2 = registry.filter_and_record(2, summaries(&["C", "D", "F", "G", "H"]));
        assert_eq!(ids(&page2), vec!["F", "G", "H"]);
        assert_eq!(registry.recorded(2), set(&["C", "D", "F", "G", "H"]));
    }

    #[test]
    fn test_refetching_same_page_is_stable() {
        let registry = SeenRegistry::new(DedupPolicy::PerPage);
        registry.filter_and_record(1, summaries(&["A", "B"]));

        let again = registry.filter_and_record(1, summaries(&["A", "B"]));
        assert_eq!(ids(&again), vec!["A", "B"]);
    }

    #[test]
    fn test_earlier_page_loses_ids_claimed_by_later_page() {
        let registry = SeenRegistry::new(DedupPolicy::PerPage);
        registry.filter_and_record(2, summaries(&["C", "F"]));

        let page1 = registry.filter_and_record(1, summaries(&["A", "C"]));
        assert_eq!(ids(&page1), vec!["A"]);
        assert_eq!(registry.recorded(1), set(&["A", "C"]));
    }

    #[test]
    fn test_global_policy_never_filters() {
        let registry = SeenRegistry::new(DedupPolicy::Global);
        registry.filter_and_record(1, summaries(&["A", "B"]));

        let next = registry.filter_and_record(2, summaries(&["B", "C"]));
        assert_eq!(ids(&next), vec!["B", "C"]);
        assert_eq!(registry.partition_count(), 1);
        assert_eq!(registry.recorded(7), set(&["A", "B", "C"]));
    }

    #[test]
    fn test_duplicate_ids_within_a_page_collapse() {
        let registry = SeenRegistry::new(DedupPolicy::PerPage);
        let page = registry.filter_and_record(1, summaries(&["A", "B", "A"]));
        assert_eq!(ids(&page), vec!["A", "B"]);
    }

    #[test]
    fn test_reset_clears_all_partitions() {
        let registry = SeenRegistry::new(DedupPolicy::PerPage);
        registry.filter_and_record(1, summaries(&["A"]));
        registry.filter_and_record(2, summaries(&["B"]));
        assert_eq!(registry.seen_count(), 2);

        registry.reset();
        assert_eq!(registry.partition_count(), 0);
        let page2 = registry.filter_and_record(2, summaries(&["A"]));
        assert_eq!(ids(&page2), vec!["A"]);
    }
}
