//! Relevance scoring for one (query, font) pair.
//!
//! Rules are checked in order and the first match wins:
//! exact name, name prefix, name substring, id prefix, id substring.
//! Category and tag text never produce a match on their own.

use serde::{Deserialize, Serialize};

use crate::model::{FontInfo, CATALOG_ID_SEPARATOR};

pub const BASE_SCORE: u32 = 50;
pub const EXACT_NAME_BONUS: u32 = 100;
pub const NAME_PREFIX_BONUS: u32 = 80;
pub const NAME_CONTAINS_BONUS: u32 = 60;
pub const ID_PREFIX_BONUS: u32 = 40;
pub const ID_CONTAINS_BONUS: u32 = 25;
/// Shortest query allowed to match inside a name.
pub const MIN_NAME_CONTAINS_LEN: usize = 3;
/// Shortest query allowed to match inside an id.
pub const MIN_ID_CONTAINS_LEN: usize = 4;
pub const DEFAULT_POPULARITY_DIVISOR: u32 = 2;

/// Tunable scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub base: u32,
    pub exact_name: u32,
    pub name_prefix: u32,
    pub name_contains: u32,
    pub id_prefix: u32,
    pub id_contains: u32,
    pub min_name_contains_len: usize,
    pub min_id_contains_len: usize,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            base: BASE_SCORE,
            exact_name: EXACT_NAME_BONUS,
            name_prefix: NAME_PREFIX_BONUS,
            name_contains: NAME_CONTAINS_BONUS,
            id_prefix: ID_PREFIX_BONUS,
            id_contains: ID_CONTAINS_BONUS,
            min_name_contains_len: MIN_NAME_CONTAINS_LEN,
            min_id_contains_len: MIN_ID_CONTAINS_LEN,
        }
    }
}

/// Ranking behaviour handed to a repository at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingPolicy {
    pub use_popularity: bool,
    /// `score += popularity / divisor`; zero disables the bonus.
    pub popularity_divisor: u32,
    pub weights: ScoreWeights,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            use_popularity: true,
            popularity_divisor: DEFAULT_POPULARITY_DIVISOR,
            weights: ScoreWeights::default(),
        }
    }
}

impl RankingPolicy {
    pub fn without_popularity() -> Self {
        Self {
            use_popularity: false,
            ..Self::default()
        }
    }

    pub fn popularity_bonus(&self, popularity: u32) -> u32 {
        if !self.use_popularity || popularity == 0 || self.popularity_divisor == 0 {
            return 0;
        }
        popularity / self.popularity_divisor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactName,
    NamePrefix,
    NameContains,
    IdPrefix,
    IdContains,
    /// Listed by category alone, without a text query.
    Category,
    /// Part of a full catalog listing.
    Listing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub value: u32,
    pub match_type: MatchType,
}

/// Score `font` (stored under `id`) against `query`. Comparison is
/// case-insensitive. `None` means no rule matched.
///
/// The id rules accept either the full CatalogID or its source-local key,
/// so `fira-code` matches `nerd.fira-code` by prefix.
pub fn score_font(
    query: &str,
    id: &str,
    font: &FontInfo,
    policy: &RankingPolicy,
) -> Option<Score> {
    if query.is_empty() {
        return None;
    }

    let weights = &policy.weights;
    let query = query.to_lowercase();
    let query_len = query.chars().count();
    let name = font.name.to_lowercase();
    let id = id.to_lowercase();
    let local_key = id
        .split_once(CATALOG_ID_SEPARATOR)
        .map_or(id.as_str(), |(_, key)| key);

    let (bonus, match_type) = if name == query {
        (weights.exact_name, MatchType::ExactName)
    } else if name.starts_with(&query) {
        (weights.name_prefix, MatchType::NamePrefix)
    } else if query_len >= weights.min_name_contains_len && name.contains(&query) {
        (weights.name_contains, MatchType::NameContains)
    } else if id.starts_with(&query) || local_key.starts_with(&query) {
        (weights.id_prefix, MatchType::IdPrefix)
    } else if query_len >= weights.min_id_contains_len && id.contains(&query) {
        (weights.id_contains, MatchType::IdContains)
    } else {
        return None;
    };

    // Weights and popularity are both unbounded inputs.
    let value = weights
        .base
        .saturating_add(bonus)
        .saturating_add(policy.popularity_bonus(font.popularity));
    Some(Score { value, match_type })
}
