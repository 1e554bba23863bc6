//! Map installed font family names back to catalog entries.
//!
//! Names are compared after [`normalize_family_name`]. A family carrying a
//! Nerd Font suffix (`"JetBrainsMono Nerd Font"`) is steered to the Nerd
//! Fonts source, and falls back to its base name (`"JetBrainsMono"`) against
//! the local part of CatalogIDs.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::Serialize;

use crate::model::{FontInfo, FontManifest, CATALOG_ID_SEPARATOR};
use crate::rank::SourcePriorities;

/// Prefix of the source that publishes patched Nerd Font families.
pub const NERD_PREFIX: &str = "nerd";

const NERD_MARKERS: [&str; 3] = [" nerd font", "nerdfont", " nerd"];
const VARIANT_SUFFIXES: [&str; 3] = ["NL", "Propo", "Proportional"];

/// Catalog entry matched to one installed family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledFontMatch {
    pub font_id: String,
    pub license: String,
    pub categories: Vec<String>,
    /// Manifest key of the owning source.
    pub source: String,
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry<'a> {
    font_id: &'a str,
    source: &'a str,
    font: &'a FontInfo,
    priority: u32,
}

impl IndexEntry<'_> {
    fn to_match(self) -> InstalledFontMatch {
        InstalledFontMatch {
            font_id: self.font_id.to_string(),
            license: self.font.license.clone(),
            categories: self.font.categories.clone(),
            source: self.source.to_string(),
        }
    }
}

/// Lookup tables over one manifest, keyed by normalized name. Every bucket
/// is ordered by source priority, then CatalogID.
#[derive(Debug, Default)]
pub struct FamilyIndex<'a> {
    by_name: HashMap<String, Vec<IndexEntry<'a>>>,
    by_local_key: HashMap<String, Vec<IndexEntry<'a>>>,
    nerd_source: Option<&'a str>,
}

impl<'a> FamilyIndex<'a> {
    /// `nerd_source` names the manifest key that Nerd Font families are
    /// steered to, when such a source is loaded.
    pub fn build(
        manifest: &'a FontManifest,
        priorities: &SourcePriorities,
        nerd_source: Option<&'a str>,
    ) -> Self {
        let mut index = Self {
            nerd_source,
            ..Self::default()
        };

        for (source_key, source) in &manifest.sources {
            let priority = priorities.get(source_key);
            for (id, font) in &source.fonts {
                let entry = IndexEntry {
                    font_id: id,
                    source: source_key,
                    font,
                    priority,
                };
                let local_key = id
                    .split_once(CATALOG_ID_SEPARATOR)
                    .map_or(id.as_str(), |(_, key)| key);

                index
                    .by_name
                    .entry(normalize_family_name(&font.name))
                    .or_default()
                    .push(entry);
                index
                    .by_local_key
                    .entry(normalize_family_name(local_key))
                    .or_default()
                    .push(entry);
            }
        }

        for bucket in index.by_name.values_mut().chain(index.by_local_key.values_mut()) {
            bucket.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.font_id.cmp(b.font_id))
            });
        }
        debug!(
            "family index: {} names, {} local keys",
            index.by_name.len(),
            index.by_local_key.len()
        );
        index
    }

    /// Best catalog entry for an installed `family`, or `None`.
    ///
    /// Tries the full normalized name against font names, then against
    /// local keys. A suffixed family then tries its base name against local
    /// keys, where a Nerd Font family only accepts the Nerd Fonts source.
    /// Without that source loaded such a family stays unmatched.
    pub fn match_family(&self, family: &str) -> Option<InstalledFontMatch> {
        let normalized = normalize_family_name(family);
        let base = base_family_name(family);
        let has_suffix = base != family;
        let wants_nerd = has_suffix && family.to_lowercase().contains("nerd");
        let expected = if wants_nerd { self.nerd_source } else { None };

        if let Some(hit) = pick(self.by_name.get(&normalized), expected) {
            return Some(hit.to_match());
        }
        if let Some(hit) = pick(self.by_local_key.get(&normalized), expected) {
            return Some(hit.to_match());
        }
        if !has_suffix {
            return None;
        }

        let candidates = self.by_local_key.get(&normalize_family_name(base))?;
        let hit = if wants_nerd {
            let source = self.nerd_source?;
            candidates.iter().find(|c| c.source == source)?
        } else {
            candidates.first()?
        };
        Some(hit.to_match())
    }
}

fn pick<'a>(
    candidates: Option<&Vec<IndexEntry<'a>>>,
    expected: Option<&str>,
) -> Option<IndexEntry<'a>> {
    let candidates = candidates?;
    expected
        .and_then(|source| candidates.iter().find(|c| c.source == source))
        .or_else(|| candidates.first())
        .copied()
}

/// Match every family in `families`; unmatched and protected families are
/// left out.
pub fn match_installed_families<S: AsRef<str>>(
    index: &FamilyIndex<'_>,
    families: &[S],
    is_protected: Option<&dyn Fn(&str) -> bool>,
) -> BTreeMap<String, InstalledFontMatch> {
    let mut matches = BTreeMap::new();
    for family in families {
        let family = family.as_ref();
        if is_protected.is_some_and(|protected| protected(family)) {
            continue;
        }
        if let Some(hit) = index.match_family(family) {
            matches.insert(family.to_string(), hit);
        }
    }
    debug!("matched {} of {} installed families", matches.len(), families.len());
    matches
}

/// Lowercase and drop spaces, hyphens and underscores.
pub fn normalize_family_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Strip a Nerd Font marker and trailing variant suffixes (`NL`, `Propo`).
/// `Mono` is kept since it usually belongs to the family name.
pub fn base_family_name(family: &str) -> &str {
    let lower = family.to_ascii_lowercase();
    let mut base = NERD_MARKERS
        .iter()
        .filter_map(|marker| lower.find(*marker))
        .find(|&at| at > 0)
        .map_or(family, |at| family[..at].trim());

    for suffix in VARIANT_SUFFIXES {
        let cut = base.len().saturating_sub(suffix.len());
        if base.len() > suffix.len()
            && base.is_char_boundary(cut)
            && base[cut..].eq_ignore_ascii_case(suffix)
        {
            base = base[..cut].trim();
        }
    }
    base
}
