//! Catalog data model: wire datasets, normalized fonts and the merged manifest.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Separator between a source prefix and a source-local font key.
pub const CATALOG_ID_SEPARATOR: char = '.';

/// One configured upstream source, as consumed from the sources config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// Display name; also the manifest key and the cache file stem.
    pub name: String,
    pub url: String,
    pub prefix: String,
    pub enabled: bool,
    /// Lower numbers rank first.
    pub priority: u32,
}

/// Header block of a source file (`source_info`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
    /// The Unix epoch when the source omits it.
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    #[serde(default, rename = "total_fonts")]
    pub total_font_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVariant {
    pub name: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub style: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsets: Vec<String>,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

/// A font entry exactly as published by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFont {
    pub name: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub license: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub designer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub foundry: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metadata_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    #[serde(default)]
    pub variants: Vec<RawVariant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unicode_ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sample_text: String,
}

/// Complete contents of one source file; also the on-disk cache payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSourceDataset {
    #[serde(default, rename = "source_info")]
    pub source_meta: SourceMeta,
    #[serde(default)]
    pub fonts: BTreeMap<String, RawFont>,
}

/// Normalized font record stored in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    pub name: String,
    pub license: String,
    pub license_url: String,
    pub designer: String,
    pub foundry: String,
    pub version: String,
    pub description: String,
    pub last_modified: DateTime<Utc>,
    pub metadata_url: String,
    pub source_url: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub popularity: u32,
    pub subsets: Vec<String>,
    pub variant_names: Vec<String>,
    /// One URL per file type across all variants, see [`FontInfo::from_raw`].
    pub files: BTreeMap<String, String>,
    pub variant_files: BTreeMap<String, BTreeMap<String, String>>,
}

impl FontInfo {
    /// Normalize a wire font. `source_updated` stands in for a missing or
    /// unparseable `last_modified`.
    ///
    /// Variants sharing a name are merged into one `variant_files` entry,
    /// later files replacing earlier ones of the same type. `files` is then
    /// filled from `variant_files`: for each file type the URL comes from the
    /// `regular` variant when it has one, otherwise from the variant with the
    /// smallest name that provides it.
    pub fn from_raw(raw: &RawFont, source_updated: DateTime<Utc>) -> Self {
        let mut variant_names: Vec<String> = Vec::with_capacity(raw.variants.len());
        let mut variant_files: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut subsets = BTreeSet::new();

        for variant in &raw.variants {
            if !variant_files.contains_key(&variant.name) {
                variant_names.push(variant.name.clone());
            }
            variant_files
                .entry(variant.name.clone())
                .or_default()
                .extend(variant.files.iter().map(|(k, v)| (k.clone(), v.clone())));
            subsets.extend(variant.subsets.iter().cloned());
        }

        let mut ordered: Vec<(&String, &BTreeMap<String, String>)> =
            variant_files.iter().collect();
        ordered.sort_by_key(|(name, _)| !name.eq_ignore_ascii_case("regular"));

        let mut files = BTreeMap::new();
        for (_, variant) in ordered {
            for (kind, url) in variant {
                files.entry(kind.clone()).or_insert_with(|| url.clone());
            }
        }

        Self {
            name: raw.name.clone(),
            license: raw.license.clone(),
            license_url: raw.license_url.clone(),
            designer: raw.designer.clone(),
            foundry: raw.foundry.clone(),
            version: raw.version.clone(),
            description: raw.description.clone(),
            last_modified: parse_last_modified(&raw.last_modified).unwrap_or(source_updated),
            metadata_url: raw.metadata_url.clone(),
            source_url: raw.source_url.clone(),
            categories: raw.categories.clone(),
            tags: raw.tags.clone(),
            popularity: raw.popularity,
            subsets: subsets.into_iter().collect(),
            variant_names,
            files,
            variant_files,
        }
    }

    /// Case-insensitive exact category membership.
    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.to_lowercase() == category.to_lowercase())
    }
}

/// One source's slice of the merged manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub description: String,
    pub url: String,
    pub last_updated: DateTime<Utc>,
    /// Keyed by CatalogID.
    pub fonts: BTreeMap<String, FontInfo>,
}

/// Merged catalog for one acquisition, keyed by source display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontManifest {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub sources: BTreeMap<String, SourceInfo>,
}

impl FontManifest {
    pub fn font_count(&self) -> usize {
        self.sources.values().map(|s| s.fonts.len()).sum()
    }
}

/// Build `{prefix}.{local_key}`.
pub fn catalog_id(prefix: &str, local_key: &str) -> String {
    format!("{prefix}{CATALOG_ID_SEPARATOR}{local_key}")
}

/// Prefix part of a CatalogID, `None` when the id carries no separator.
pub fn catalog_prefix(id: &str) -> Option<&str> {
    id.split_once(CATALOG_ID_SEPARATOR).map(|(prefix, _)| prefix)
}

fn parse_last_modified(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn variant(name: &str, files: &[(&str, &str)]) -> RawVariant {
        RawVariant {
            name: name.to_string(),
            weight: 400,
            style: "normal".to_string(),
            subsets: vec!["latin".to_string()],
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn raw_font(variants: Vec<RawVariant>) -> RawFont {
        let mut font: RawFont =
            serde_json::from_value(serde_json::json!({ "name": "Roboto" })).expect("raw font");
        font.variants = variants;
        font
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn regular_variant_wins_flattened_files() {
        let font = raw_font(vec![
            variant("bold", &[("ttf", "b.ttf"), ("woff2", "b.woff2")]),
            variant("Regular", &[("ttf", "r.ttf")]),
            variant("italic", &[("ttf", "i.ttf"), ("otf", "i.otf")]),
        ]);
        let info = FontInfo::from_raw(&font, epoch());

        assert_eq!(info.files["ttf"], "r.ttf");
        assert_eq!(info.files["woff2"], "b.woff2");
        assert_eq!(info.files["otf"], "i.otf");
        assert_eq!(info.variant_names, vec!["bold", "Regular", "italic"]);
        assert_eq!(info.variant_files["bold"]["ttf"], "b.ttf");
    }

    #[test]
    fn smallest_variant_name_wins_without_regular() {
        let font = raw_font(vec![
            variant("700", &[("ttf", "700.ttf")]),
            variant("300", &[("ttf", "300.ttf")]),
        ]);
        let info = FontInfo::from_raw(&font, epoch());
        assert_eq!(info.files["ttf"], "300.ttf");
    }

    #[test]
    fn last_modified_falls_back_to_source_timestamp() {
        let mut font = raw_font(Vec::new());
        assert_eq!(FontInfo::from_raw(&font, epoch()).last_modified, epoch());

        font.last_modified = "2023-05-06".to_string();
        let parsed = FontInfo::from_raw(&font, epoch()).last_modified;
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 5, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn catalog_prefix_splits_on_first_dot() {
        assert_eq!(catalog_id("google", "roboto"), "google.roboto");
        assert_eq!(catalog_prefix("nerd.fira.code"), Some("nerd"));
        assert_eq!(catalog_prefix("roboto"), None);
    }

    #[test]
    fn repeated_variant_names_agree_between_maps() {
        let font = raw_font(vec![
            variant("regular", &[("ttf", "first.ttf"), ("otf", "first.otf")]),
            variant("regular", &[("ttf", "second.ttf")]),
        ]);
        let info = FontInfo::from_raw(&font, epoch());

        assert_eq!(info.variant_names, vec!["regular"]);
        assert_eq!(info.variant_files["regular"]["ttf"], "second.ttf");
        assert_eq!(info.variant_files["regular"]["otf"], "first.otf");
        for (kind, url) in &info.files {
            assert_eq!(&info.variant_files["regular"][kind], url);
        }
    }

    #[test]
    fn source_without_timestamp_keeps_its_fonts() {
        let dataset: RawSourceDataset = serde_json::from_value(serde_json::json!({
            "source_info": { "name": "Custom" },
            "fonts": { "roboto": { "name": "Roboto" } }
        }))
        .expect("dataset");
        assert_eq!(dataset.source_meta.last_updated, DateTime::<Utc>::default());
        assert_eq!(dataset.fonts.len(), 1);
    }
}
