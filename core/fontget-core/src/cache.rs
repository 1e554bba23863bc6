//! Per-source on-disk JSON cache.
//!
//! Every source owns one file named after its normalized display name. An
//! unreadable or corrupt file reads as a miss and never affects the other
//! sources. The file mtime is the staleness signal.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use log::{debug, warn};
use walkdir::WalkDir;

use crate::freshness::FreshnessPolicy;
use crate::model::RawSourceDataset;

/// A cached dataset together with where and when it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub source_name: String,
    pub payload: RawSourceDataset,
    pub disk_path: PathBuf,
    pub mtime: SystemTime,
}

/// Summary of one cache file, for status listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFileStatus {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mtime: SystemTime,
    pub fresh: bool,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    freshness: FreshnessPolicy,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            freshness: FreshnessPolicy::default(),
        }
    }

    pub fn with_freshness(mut self, freshness: FreshnessPolicy) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn freshness(&self) -> FreshnessPolicy {
        self.freshness
    }

    pub fn path_for(&self, source_name: &str) -> PathBuf {
        self.dir.join(cache_file_name(source_name))
    }

    /// Load the cached dataset for `source_name`. Missing or corrupt files
    /// return `None`.
    pub fn read(&self, source_name: &str) -> Option<CacheEntry> {
        let path = self.path_for(source_name);
        let mtime = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => {
                debug!("cache miss for {source_name}: {}", path.display());
                return None;
            }
        };

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("ignoring unreadable cache {}: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_slice::<RawSourceDataset>(&bytes) {
            Ok(payload) => Some(CacheEntry {
                source_name: source_name.to_string(),
                payload,
                disk_path: path,
                mtime,
            }),
            Err(err) => {
                warn!("ignoring corrupt cache {}: {err}", path.display());
                None
            }
        }
    }

    /// Replace the cache file for `source_name`. Failures are logged and
    /// reported as `false`; the caller keeps using the dataset it has.
    pub fn write(&self, source_name: &str, dataset: &RawSourceDataset) -> bool {
        match self.try_write(source_name, dataset) {
            Ok(path) => {
                debug!("cached {source_name} at {}", path.display());
                true
            }
            Err(err) => {
                warn!("failed to cache source {source_name}: {err:#}");
                false
            }
        }
    }

    fn try_write(&self, source_name: &str, dataset: &RawSourceDataset) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache directory {}", self.dir.display()))?;

        let path = self.path_for(source_name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(dataset)?;

        let mut file =
            fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(&json)
            .with_context(|| format!("writing {}", tmp.display()))?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(path)
    }

    pub fn is_fresh(&self, mtime: SystemTime) -> bool {
        self.freshness.is_fresh(mtime)
    }

    /// All cache files, sorted by file name.
    pub fn entries(&self) -> Result<Vec<CacheFileStatus>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_cache_file(entry.path()) {
                continue;
            }
            let meta = entry
                .metadata()
                .with_context(|| format!("inspecting {}", entry.path().display()))?;
            let mtime = meta.modified()?;
            found.push(CacheFileStatus {
                file_name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path().to_path_buf(),
                size_bytes: meta.len(),
                mtime,
                fresh: self.is_fresh(mtime),
            });
        }

        found.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(found)
    }

    /// Delete one source's cache file. Returns whether a file existed.
    pub fn remove(&self, source_name: &str) -> Result<bool> {
        let path = self.path_for(source_name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        Ok(true)
    }

    /// Delete every cache file and recreate the empty directory.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.entries()?.len();
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("clearing {}", self.dir.display()))?;
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("recreating {}", self.dir.display()))?;
        Ok(removed)
    }
}

/// `"Google Fonts"` -> `"google-fonts.json"`.
pub fn cache_file_name(source_name: &str) -> String {
    let mut stem = String::with_capacity(source_name.len());
    for ch in source_name.trim().chars() {
        if ch.is_alphanumeric() {
            stem.extend(ch.to_lowercase());
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "source.json".to_string()
    } else {
        format!("{stem}.json")
    }
}

fn is_cache_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_display_names() {
        assert_eq!(cache_file_name("Google Fonts"), "google-fonts.json");
        assert_eq!(cache_file_name("  Nerd  Fonts! "), "nerd-fonts.json");
        assert_eq!(cache_file_name("Font_Squirrel"), "font-squirrel.json");
        assert_eq!(cache_file_name("???"), "source.json");
    }

    #[test]
    fn recognises_cache_files() {
        assert!(is_cache_file(Path::new("/c/google-fonts.json")));
        assert!(!is_cache_file(Path::new("/c/google-fonts.json.tmp")));
        assert!(!is_cache_file(Path::new("/c/notes.txt")));
    }
}
