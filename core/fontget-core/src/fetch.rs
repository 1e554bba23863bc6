//! Obtain one source's dataset from the network or the cache.

use std::time::{Duration, Instant, SystemTime};

use log::{debug, info, warn};

use crate::cache::CacheStore;
use crate::error::{CatalogError, CatalogResult};
use crate::freshness::{AcquisitionMode, CacheDecision};
use crate::http::{SourceTransport, DEFAULT_HTTP_TIMEOUT};
use crate::model::{RawSourceDataset, SourceDescriptor};

/// Where a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetOrigin {
    Network,
    Cache { stale: bool },
}

#[derive(Debug, Clone)]
pub struct FetchedSource {
    pub dataset: RawSourceDataset,
    pub origin: DatasetOrigin,
}

pub struct SourceFetcher<'a> {
    cache: &'a CacheStore,
    transport: &'a dyn SourceTransport,
    timeout: Duration,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(cache: &'a CacheStore, transport: &'a dyn SourceTransport) -> Self {
        Self {
            cache,
            transport,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve `source` under `mode`.
    ///
    /// A failed network fetch falls back to any cached copy, stale or not.
    /// An expired `deadline` counts as a failed fetch.
    pub fn fetch(
        &self,
        source: &SourceDescriptor,
        mode: AcquisitionMode,
        deadline: Option<Instant>,
    ) -> CatalogResult<FetchedSource> {
        let cached = self.cache.read(&source.name);
        let decision = self.cache.freshness().decide(
            mode,
            cached.as_ref().map(|entry| entry.mtime),
            SystemTime::now(),
        );

        match decision {
            CacheDecision::UseCache => {
                let Some(entry) = cached else {
                    return Err(CatalogError::CacheMiss {
                        source_name: source.name.clone(),
                    });
                };
                let stale = !self.cache.is_fresh(entry.mtime);
                debug!("using cached {} (stale: {stale})", source.name);
                Ok(FetchedSource {
                    dataset: entry.payload,
                    origin: DatasetOrigin::Cache { stale },
                })
            }
            CacheDecision::Miss => Err(CatalogError::CacheMiss {
                source_name: source.name.clone(),
            }),
            CacheDecision::Fetch => match self.fetch_remote(source, deadline) {
                Ok(dataset) => {
                    self.cache.write(&source.name, &dataset);
                    Ok(FetchedSource {
                        dataset,
                        origin: DatasetOrigin::Network,
                    })
                }
                Err(err) => match cached {
                    Some(entry) => {
                        warn!("{err}; falling back to cached copy");
                        let stale = !self.cache.is_fresh(entry.mtime);
                        Ok(FetchedSource {
                            dataset: entry.payload,
                            origin: DatasetOrigin::Cache { stale },
                        })
                    }
                    None => Err(err),
                },
            },
        }
    }

    fn fetch_remote(
        &self,
        source: &SourceDescriptor,
        deadline: Option<Instant>,
    ) -> CatalogResult<RawSourceDataset> {
        let failed = |reason: String| CatalogError::FetchFailed {
            source_name: source.name.clone(),
            reason,
        };

        let timeout = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(failed("deadline exceeded".to_string()));
                }
                remaining.min(self.timeout)
            }
            None => self.timeout,
        };

        info!("fetching {} from {}", source.name, source.url);
        let response = self.transport.get(&source.url, timeout).map_err(failed)?;
        if response.status != 200 {
            return Err(failed(format!("HTTP {}", response.status)));
        }

        let dataset: RawSourceDataset = serde_json::from_slice(&response.body)
            .map_err(|e| failed(format!("invalid source data: {e}")))?;
        debug!(
            "fetched {}: {} fonts (version {})",
            source.name,
            dataset.fonts.len(),
            dataset.source_meta.version
        );
        Ok(dataset)
    }
}
