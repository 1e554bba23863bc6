//! Deterministic ordering of scored search results.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::model::SourceDescriptor;
use crate::score::{MatchType, RankingPolicy};

/// Priority given to sources missing from the configuration.
pub const LOWEST_PRIORITY: u32 = u32::MAX;

/// One hit returned by a repository search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub name: String,
    #[serde(rename = "id")]
    pub catalog_id: String,
    /// Manifest key of the owning source.
    #[serde(rename = "source")]
    pub source_key: String,
    #[serde(rename = "source_name")]
    pub source_display_name: String,
    pub license: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub popularity: u32,
    #[serde(skip)]
    pub score: u32,
    #[serde(skip)]
    pub match_type: MatchType,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Source name -> configured priority (lower ranks first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePriorities {
    by_name: HashMap<String, u32>,
}

impl SourcePriorities {
    pub fn from_descriptors(descriptors: &[SourceDescriptor]) -> Self {
        Self {
            by_name: descriptors
                .iter()
                .map(|d| (d.name.clone(), d.priority))
                .collect(),
        }
    }

    pub fn get(&self, source_name: &str) -> u32 {
        self.by_name
            .get(source_name)
            .copied()
            .unwrap_or(LOWEST_PRIORITY)
    }
}

/// Sort `results` into their final order.
///
/// Keys, most significant first: best score among results with the same
/// name (descending), name, source priority, own score (descending),
/// popularity (descending, only when the policy uses it), CatalogID.
pub fn rank_results(
    results: &mut [SearchResult],
    priorities: &SourcePriorities,
    policy: &RankingPolicy,
) {
    let mut best_by_name: HashMap<String, u32> = HashMap::new();
    for result in results.iter() {
        let best = best_by_name.entry(result.name.clone()).or_insert(0);
        *best = (*best).max(result.score);
    }

    results.sort_by(|a, b| {
        let group_a = best_by_name.get(&a.name).copied().unwrap_or(0);
        let group_b = best_by_name.get(&b.name).copied().unwrap_or(0);

        group_b
            .cmp(&group_a)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| {
                priorities
                    .get(&a.source_key)
                    .cmp(&priorities.get(&b.source_key))
            })
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| {
                if policy.use_popularity {
                    b.popularity.cmp(&a.popularity)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| a.catalog_id.cmp(&b.catalog_id))
    });
}

/// Alphabetical order used for category-only listings; CatalogID breaks ties.
pub fn sort_alphabetically(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.catalog_id.cmp(&b.catalog_id))
    });
}
