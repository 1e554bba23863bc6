//! Merge every enabled source into one [`FontManifest`].
//!
//! Sources are fetched in parallel on a bounded rayon pool and joined before
//! merging. A source that cannot be fetched and has no cache is skipped;
//! the build only fails when nothing could be loaded at all.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::cache::CacheStore;
use crate::config::MAX_JOBS;
use crate::error::{CatalogError, CatalogResult};
use crate::fetch::{DatasetOrigin, FetchedSource, SourceFetcher};
use crate::freshness::AcquisitionMode;
use crate::http::{SourceTransport, DEFAULT_HTTP_TIMEOUT};
use crate::model::{
    catalog_id, FontInfo, FontManifest, RawSourceDataset, SourceDescriptor, SourceInfo,
};

pub const MANIFEST_VERSION: &str = "1.0";

/// `(current, total, message)` progress hook. Called from worker threads.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

/// Per-call acquisition parameters.
#[derive(Clone, Copy, Default)]
pub struct AcquireOptions<'a> {
    pub mode: AcquisitionMode,
    /// Aborts in-flight fetches; an expired deadline falls back to cache.
    pub deadline: Option<Instant>,
    pub progress: Option<ProgressFn<'a>>,
}

impl<'a> AcquireOptions<'a> {
    pub fn new(mode: AcquisitionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, current: usize, total: usize, message: &str) {
        if let Some(progress) = self.progress {
            progress(current, total, message);
        }
    }
}

pub struct ManifestBuilder<'a> {
    descriptors: &'a [SourceDescriptor],
    cache: &'a CacheStore,
    transport: &'a dyn SourceTransport,
    timeout: Duration,
    jobs: Option<usize>,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(
        descriptors: &'a [SourceDescriptor],
        cache: &'a CacheStore,
        transport: &'a dyn SourceTransport,
    ) -> Self {
        Self {
            descriptors,
            cache,
            transport,
            timeout: DEFAULT_HTTP_TIMEOUT,
            jobs: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Worker count for the fetch pool. Without it the pool gets one worker
    /// per enabled source, up to [`MAX_JOBS`].
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs.max(1));
        self
    }

    pub fn build(&self, options: &AcquireOptions<'_>) -> CatalogResult<FontManifest> {
        let enabled: Vec<&SourceDescriptor> =
            self.descriptors.iter().filter(|d| d.enabled).collect();
        if enabled.is_empty() {
            return Err(CatalogError::NoSourcesEnabled);
        }

        let total = enabled.len();
        options.report(0, total, "Loading sources...");

        let outcomes = self.fetch_all(&enabled, options);
        self.merge(outcomes, options.mode)
    }

    fn fetch_all<'s>(
        &self,
        enabled: &[&'s SourceDescriptor],
        options: &AcquireOptions<'_>,
    ) -> Vec<(&'s SourceDescriptor, CatalogResult<FetchedSource>)> {
        let fetcher = SourceFetcher::new(self.cache, self.transport).with_timeout(self.timeout);
        let total = enabled.len();
        let finished = AtomicUsize::new(0);

        let run = || {
            enabled
                .par_iter()
                .map(|&source| {
                    let outcome = fetcher.fetch(source, options.mode, options.deadline);
                    let current = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    let verb = if outcome.is_ok() { "Loaded" } else { "Skipped" };
                    options.report(current, total, &format!("{verb} {}", source.name));
                    (source, outcome)
                })
                .collect::<Vec<_>>()
        };

        let workers = self.jobs.unwrap_or_else(|| total.clamp(1, MAX_JOBS));
        match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(run),
            Err(err) => {
                warn!("could not build fetch pool ({err}); using the global pool");
                run()
            }
        }
    }

    fn merge(
        &self,
        outcomes: Vec<(&SourceDescriptor, CatalogResult<FetchedSource>)>,
        mode: AcquisitionMode,
    ) -> CatalogResult<FontManifest> {
        let mut sources = BTreeMap::new();
        let mut failures = Vec::new();
        let mut oldest: Option<DateTime<Utc>> = None;

        for (descriptor, outcome) in outcomes {
            match outcome {
                Ok(fetched) => {
                    if let DatasetOrigin::Cache { stale: true } = fetched.origin {
                        info!("{} served from a stale cache", descriptor.name);
                    }
                    let info = source_info(descriptor, &fetched.dataset);
                    oldest = Some(match oldest {
                        Some(ts) => ts.min(info.last_updated),
                        None => info.last_updated,
                    });
                    sources.insert(descriptor.name.clone(), info);
                }
                Err(err) => {
                    warn!("skipping source {}: {err}", descriptor.name);
                    failures.push(err.to_string());
                }
            }
        }

        let Some(oldest) = oldest else {
            return Err(if mode.allows_network() {
                CatalogError::NoSourcesLoaded { failures }
            } else {
                CatalogError::NoCachedSourcesAvailable { failures }
            });
        };

        let manifest = FontManifest {
            version: MANIFEST_VERSION.to_string(),
            last_updated: if mode.allows_network() { Utc::now() } else { oldest },
            sources,
        };
        info!(
            "manifest ready: {} sources, {} fonts",
            manifest.sources.len(),
            manifest.font_count()
        );
        Ok(manifest)
    }
}

/// Normalize one dataset, namespacing every font under the source prefix.
pub fn source_info(descriptor: &SourceDescriptor, dataset: &RawSourceDataset) -> SourceInfo {
    let meta = &dataset.source_meta;
    let fonts = dataset
        .fonts
        .iter()
        .map(|(key, raw)| {
            (
                catalog_id(&descriptor.prefix, key),
                FontInfo::from_raw(raw, meta.last_updated),
            )
        })
        .collect();

    SourceInfo {
        name: non_empty_or(&meta.name, &descriptor.name),
        description: meta.description.clone(),
        url: non_empty_or(&meta.url, &descriptor.url),
        last_updated: meta.last_updated,
        fonts,
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
