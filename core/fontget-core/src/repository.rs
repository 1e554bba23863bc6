//! Immutable, searchable handle over one built manifest.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::cache::CacheStore;
use crate::config::{CatalogSettings, SourcesConfig};
use crate::error::{CatalogError, CatalogResult};
use crate::freshness::{AcquisitionMode, FreshnessPolicy};
use crate::http::{HttpTransport, SourceTransport};
use crate::manifest::{AcquireOptions, ManifestBuilder, ProgressFn};
use crate::matching::{match_installed_families, FamilyIndex, InstalledFontMatch, NERD_PREFIX};
use crate::model::{
    catalog_prefix, FontInfo, FontManifest, SourceDescriptor, SourceInfo, CATALOG_ID_SEPARATOR,
};
use crate::rank::{rank_results, sort_alphabetically, SearchResult, SourcePriorities};
use crate::score::{score_font, MatchType, RankingPolicy};

/// A font found by exact name or id lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct FontMatch {
    pub id: String,
    pub name: String,
    /// Manifest key of the owning source.
    pub source: String,
    pub font: FontInfo,
}

/// Outcome of resolving a user's font argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FontResolution<'a> {
    /// A CatalogID, or a name with exactly one match.
    Found {
        id: String,
        /// Display name of the owning source.
        source_name: String,
        font: &'a FontInfo,
    },
    /// A name matched in several sources; ordered like
    /// [`Repository::find_font_matches`].
    Ambiguous(Vec<FontMatch>),
}

/// Read-only catalog. Never mutated after construction, so one instance can
/// be shared across threads.
#[derive(Debug, Clone)]
pub struct Repository {
    manifest: FontManifest,
    priorities: SourcePriorities,
    /// Lowercased prefix -> source display name.
    prefixes: HashMap<String, String>,
    policy: RankingPolicy,
}

impl Repository {
    pub fn new(
        manifest: FontManifest,
        descriptors: &[SourceDescriptor],
        policy: RankingPolicy,
    ) -> Self {
        let prefixes = descriptors
            .iter()
            .map(|d| (d.prefix.to_lowercase(), d.name.clone()))
            .collect();
        Self {
            manifest,
            priorities: SourcePriorities::from_descriptors(descriptors),
            prefixes,
            policy,
        }
    }

    /// Build a fresh manifest with an explicit transport and options.
    pub fn acquire(
        descriptors: &[SourceDescriptor],
        settings: &CatalogSettings,
        transport: &dyn SourceTransport,
        options: &AcquireOptions<'_>,
    ) -> CatalogResult<Self> {
        let cache = CacheStore::new(&settings.cache_dir)
            .with_freshness(FreshnessPolicy::new(settings.freshness_window));
        let enabled = descriptors.iter().filter(|d| d.enabled).count();
        let manifest = ManifestBuilder::new(descriptors, &cache, transport)
            .with_timeout(settings.http_timeout)
            .with_jobs(settings.worker_count(enabled))
            .build(options)?;
        Ok(Self::new(manifest, descriptors, settings.ranking))
    }

    /// Cache-preferred acquisition over HTTP.
    pub fn cached(sources: &SourcesConfig, settings: &CatalogSettings) -> CatalogResult<Self> {
        let options = AcquireOptions::new(AcquisitionMode::PreferCache);
        Self::acquire(&sources.descriptors(), settings, &HttpTransport::new(), &options)
    }

    /// Forced-refresh acquisition over HTTP.
    pub fn refreshed(
        sources: &SourcesConfig,
        settings: &CatalogSettings,
        progress: Option<ProgressFn<'_>>,
    ) -> CatalogResult<Self> {
        let mut options = AcquireOptions::new(AcquisitionMode::ForceRefresh);
        options.progress = progress;
        Self::acquire(&sources.descriptors(), settings, &HttpTransport::new(), &options)
    }

    pub fn manifest(&self) -> &FontManifest {
        &self.manifest
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    /// Ranked search. An empty query with an empty category returns nothing;
    /// an empty query with a category lists that category alphabetically.
    pub fn search_fonts(&self, query: &str, category: &str) -> Vec<SearchResult> {
        if query.is_empty() && category.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for (source_key, source) in &self.manifest.sources {
            for (id, font) in &source.fonts {
                if !category.is_empty() && !font.has_category(category) {
                    continue;
                }

                let (score, match_type) = if query.is_empty() {
                    (self.policy.weights.base, MatchType::Category)
                } else {
                    match score_font(query, id, font, &self.policy) {
                        Some(score) => (score.value, score.match_type),
                        None => continue,
                    }
                };

                results.push(search_result(source_key, source, id, font, score, match_type));
            }
        }

        if query.is_empty() {
            sort_alphabetically(&mut results);
        } else {
            rank_results(&mut results, &self.priorities, &self.policy);
        }
        results
    }

    /// Every font in the catalog, sorted by name then CatalogID.
    pub fn all_fonts(&self) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .manifest
            .sources
            .iter()
            .flat_map(|(key, source)| {
                source.fonts.iter().map(move |(id, font)| {
                    search_result(key, source, id, font, 0, MatchType::Listing)
                })
            })
            .collect();
        sort_alphabetically(&mut results);
        results
    }

    /// Top `limit` CatalogIDs for `query`, for suggestions.
    pub fn find_similar(&self, query: &str, limit: usize) -> Vec<String> {
        self.search_fonts(query, "")
            .into_iter()
            .take(limit)
            .map(|r| r.catalog_id)
            .collect()
    }

    /// Sorted, deduplicated categories across the catalog.
    pub fn all_categories(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .manifest
            .sources
            .values()
            .flat_map(|s| s.fonts.values())
            .flat_map(|f| f.categories.iter())
            .collect();
        set.into_iter().cloned().collect()
    }

    /// Case-insensitive CatalogID lookup; returns the source key and font.
    pub fn font_by_id(&self, id: &str) -> CatalogResult<(&str, &FontInfo)> {
        self.lookup_id(id)
            .map(|(key, _, font)| (key, font))
            .ok_or_else(|| CatalogError::FontNotFound { id: id.to_string() })
    }

    /// `(source key, stored CatalogID, font)` for a case-insensitive id.
    fn lookup_id(&self, id: &str) -> Option<(&str, &str, &FontInfo)> {
        let wanted = id.to_lowercase();
        self.manifest
            .sources
            .iter()
            .flat_map(|(key, source)| source.fonts.iter().map(move |(fid, f)| (key, fid, f)))
            .find(|(_, fid, _)| fid.to_lowercase() == wanted)
            .map(|(key, fid, font)| (key.as_str(), fid.as_str(), font))
    }

    /// Exact matches on name or CatalogID, ignoring case and spaces, ordered
    /// by source priority then id.
    pub fn find_font_matches(&self, name: &str) -> Vec<FontMatch> {
        let wanted = squash(name);
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<FontMatch> = self
            .manifest
            .sources
            .iter()
            .flat_map(|(key, source)| source.fonts.iter().map(move |(id, f)| (key, id, f)))
            .filter(|(_, id, font)| squash(&font.name) == wanted || squash(id) == wanted)
            .map(|(key, id, font)| FontMatch {
                id: id.clone(),
                name: font.name.clone(),
                source: key.clone(),
                font: font.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            self.priorities
                .get(&a.source)
                .cmp(&self.priorities.get(&b.source))
                .then_with(|| a.id.cmp(&b.id))
        });
        matches
    }

    /// Resolve a CatalogID (anything containing a dot) or a font name.
    ///
    /// A name with several matches across sources is returned as
    /// [`FontResolution::Ambiguous`] for the caller to choose from.
    pub fn resolve_font_query(&self, query: &str) -> CatalogResult<FontResolution<'_>> {
        let not_found = || CatalogError::FontNotFound {
            id: query.to_string(),
        };

        if query.contains(CATALOG_ID_SEPARATOR) {
            let (_, id, font) = self.lookup_id(query).ok_or_else(not_found)?;
            return Ok(FontResolution::Found {
                id: id.to_string(),
                source_name: self.source_name_for_id(id),
                font,
            });
        }

        let mut matches = self.find_font_matches(query);
        match matches.len() {
            0 => Err(not_found()),
            1 => {
                let only = matches.remove(0);
                let (_, font) = self.font_by_id(&only.id)?;
                Ok(FontResolution::Found {
                    id: only.id,
                    source_name: only.source,
                    font,
                })
            }
            _ => Ok(FontResolution::Ambiguous(matches)),
        }
    }

    /// Lookup tables for [`Repository::match_installed_font`].
    pub fn family_index(&self) -> FamilyIndex<'_> {
        let nerd_source = self
            .prefixes
            .get(NERD_PREFIX)
            .map(String::as_str)
            .filter(|name| self.manifest.sources.contains_key(*name));
        FamilyIndex::build(&self.manifest, &self.priorities, nerd_source)
    }

    /// Catalog entry for one installed family name, preferring higher
    /// priority sources.
    pub fn match_installed_font(&self, family: &str) -> Option<InstalledFontMatch> {
        self.family_index().match_family(family)
    }

    /// Match many installed families against one index. `is_protected`
    /// excludes system families from matching.
    pub fn match_installed_fonts<S: AsRef<str>>(
        &self,
        families: &[S],
        is_protected: Option<&dyn Fn(&str) -> bool>,
    ) -> BTreeMap<String, InstalledFontMatch> {
        match_installed_families(&self.family_index(), families, is_protected)
    }

    /// Display name of the source owning `id`'s prefix.
    pub fn source_name_for_id(&self, id: &str) -> String {
        let Some(prefix) = catalog_prefix(id) else {
            return "Unknown Source".to_string();
        };
        match self.prefixes.get(&prefix.to_lowercase()) {
            Some(name) => name.clone(),
            None => title_case(prefix),
        }
    }
}

fn search_result(
    source_key: &str,
    source: &SourceInfo,
    id: &str,
    font: &FontInfo,
    score: u32,
    match_type: MatchType,
) -> SearchResult {
    SearchResult {
        name: font.name.clone(),
        catalog_id: id.to_string(),
        source_key: source_key.to_string(),
        source_display_name: source.name.clone(),
        license: font.license.clone(),
        categories: font.categories.clone(),
        popularity: font.popularity,
        score,
        match_type,
    }
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn title_case(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
