//! Source configuration and catalog settings.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::freshness::DEFAULT_FRESHNESS_WINDOW;
use crate::http::{validate_source_url, DEFAULT_HTTP_TIMEOUT};
use crate::model::{SourceDescriptor, CATALOG_ID_SEPARATOR};
use crate::score::RankingPolicy;

pub const SOURCES_BASE_URL: &str =
    "https://raw.githubusercontent.com/Graphixa/FontGet-Sources/main/sources";

/// Overrides the source cache directory.
pub const CACHE_DIR_ENV: &str = "FONTGET_CACHE_DIR";
/// Overrides the sources config file location.
pub const SOURCES_CONFIG_ENV: &str = "FONTGET_SOURCES_CONFIG";

/// Upper bound on parallel source fetches.
pub const MAX_JOBS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub url: String,
    pub prefix: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default = "custom_priority")]
    pub priority: u32,
}

fn enabled_by_default() -> bool {
    true
}

fn custom_priority() -> u32 {
    100
}

/// Contents of `sources.json`, keyed by source display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub sources: BTreeMap<String, SourceEntry>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let builtin = |file: &str, prefix: &str, priority| SourceEntry {
            url: format!("{SOURCES_BASE_URL}/{file}"),
            prefix: prefix.to_string(),
            enabled: true,
            priority,
        };

        let mut sources = BTreeMap::new();
        sources.insert("Google Fonts".to_string(), builtin("google-fonts.json", "google", 1));
        sources.insert("Nerd Fonts".to_string(), builtin("nerd-fonts.json", "nerd", 2));
        sources.insert(
            "Font Squirrel".to_string(),
            builtin("font-squirrel.json", "squirrel", 3),
        );
        Self { sources }
    }
}

impl SourcesConfig {
    /// Read and validate `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data =
            fs::read(path).with_context(|| format!("reading sources config {}", path.display()))?;
        let config: Self = serde_json::from_slice(&data)
            .with_context(|| format!("parsing sources config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating sources config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Reject empty fields, unusable prefixes, bad URLs and duplicate prefixes.
    pub fn validate(&self) -> Result<()> {
        let mut prefixes = HashSet::new();
        for (name, entry) in &self.sources {
            if name.trim().is_empty() {
                bail!("source name cannot be empty");
            }
            if entry.prefix.is_empty() {
                bail!("source '{name}' has an empty prefix");
            }
            if entry.prefix.contains(CATALOG_ID_SEPARATOR)
                || entry.prefix.chars().any(char::is_whitespace)
            {
                bail!(
                    "source '{name}' prefix '{}' must not contain '.' or whitespace",
                    entry.prefix
                );
            }
            validate_source_url(&entry.url).map_err(|e| anyhow!("source '{name}': {e}"))?;
            if !prefixes.insert(entry.prefix.to_lowercase()) {
                bail!("prefix '{}' is used by more than one source", entry.prefix);
            }
        }
        Ok(())
    }

    /// Descriptors ordered by priority, then name.
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        let mut out: Vec<SourceDescriptor> = self
            .sources
            .iter()
            .map(|(name, entry)| SourceDescriptor {
                name: name.clone(),
                url: entry.url.clone(),
                prefix: entry.prefix.clone(),
                enabled: entry.enabled,
                priority: entry.priority,
            })
            .collect();
        out.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        out
    }

    pub fn add_source(&mut self, name: &str, entry: SourceEntry) -> Result<()> {
        if name.trim().is_empty() {
            bail!("source name cannot be empty");
        }
        let mut candidate = self.clone();
        candidate.sources.insert(name.to_string(), entry);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    pub fn remove_source(&mut self, name: &str) -> Result<SourceEntry> {
        self.sources
            .remove(name)
            .ok_or_else(|| anyhow!("source '{name}' does not exist"))
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let entry = self
            .sources
            .get_mut(name)
            .ok_or_else(|| anyhow!("source '{name}' does not exist"))?;
        entry.enabled = enabled;
        Ok(())
    }

    /// Case-insensitive prefix lookup.
    pub fn source_by_prefix(&self, prefix: &str) -> Option<(&str, &SourceEntry)> {
        self.sources
            .iter()
            .find(|(_, entry)| entry.prefix.eq_ignore_ascii_case(prefix))
            .map(|(name, entry)| (name.as_str(), entry))
    }
}

/// Knobs for one catalog acquisition.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub cache_dir: PathBuf,
    pub freshness_window: Duration,
    pub http_timeout: Duration,
    /// Parallel fetch workers; `None` picks one per source up to [`MAX_JOBS`].
    pub jobs: Option<usize>,
    pub ranking: RankingPolicy,
}

impl CatalogSettings {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            jobs: None,
            ranking: RankingPolicy::default(),
        }
    }

    /// Settings rooted at the per-user cache directory.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(default_cache_dir()?))
    }

    pub fn with_ranking(mut self, ranking: RankingPolicy) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn worker_count(&self, sources: usize) -> usize {
        match self.jobs {
            Some(jobs) => jobs.max(1),
            None => sources.clamp(1, MAX_JOBS),
        }
    }
}

fn app_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".fontget"))
        .ok_or_else(|| anyhow!("could not determine the home directory"))
}

/// `$FONTGET_CACHE_DIR`, else `~/.fontget/sources`.
pub fn default_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    Ok(app_dir()?.join("sources"))
}

/// `$FONTGET_SOURCES_CONFIG`, else `~/.fontget/sources.json`.
pub fn default_sources_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(SOURCES_CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(app_dir()?.join("sources.json"))
}
