//! Acquisition modes and the cache-vs-network decision.

use std::time::{Duration, SystemTime};

/// Default age after which a cached source is considered stale.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// How much network access one acquisition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionMode {
    /// Serve whatever is cached, regardless of age. Never touches the network.
    CacheOnly,
    /// Serve a fresh cache entry, otherwise fetch.
    #[default]
    PreferCache,
    /// Always fetch first.
    ForceRefresh,
}

impl AcquisitionMode {
    pub fn allows_network(self) -> bool {
        !matches!(self, AcquisitionMode::CacheOnly)
    }
}

/// What the fetcher should do for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    UseCache,
    /// Go to the network; a failed fetch may still fall back to any cache.
    Fetch,
    /// Nothing usable and no network allowed.
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    window: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW)
    }
}

impl FreshnessPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `now - mtime < window`. A timestamp in the future counts as fresh.
    pub fn is_fresh_at(&self, mtime: SystemTime, now: SystemTime) -> bool {
        match now.duration_since(mtime) {
            Ok(age) => age < self.window,
            Err(_) => true,
        }
    }

    pub fn is_fresh(&self, mtime: SystemTime) -> bool {
        self.is_fresh_at(mtime, SystemTime::now())
    }

    pub fn decide(
        &self,
        mode: AcquisitionMode,
        cached_mtime: Option<SystemTime>,
        now: SystemTime,
    ) -> CacheDecision {
        match (mode, cached_mtime) {
            (AcquisitionMode::CacheOnly, Some(_)) => CacheDecision::UseCache,
            (AcquisitionMode::CacheOnly, None) => CacheDecision::Miss,
            (AcquisitionMode::PreferCache, Some(mtime)) if self.is_fresh_at(mtime, now) => {
                CacheDecision::UseCache
            }
            (AcquisitionMode::PreferCache, _) | (AcquisitionMode::ForceRefresh, _) => {
                CacheDecision::Fetch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn staleness_boundary_is_exclusive() {
        let policy = FreshnessPolicy::default();
        let now = SystemTime::now();
        assert!(policy.is_fresh_at(now - 23 * HOUR, now));
        assert!(!policy.is_fresh_at(now - 24 * HOUR, now));
        assert!(policy.is_fresh_at(now + HOUR, now));
    }

    #[test]
    fn cache_only_ignores_age() {
        let policy = FreshnessPolicy::default();
        let now = SystemTime::now();
        let old = Some(now - 300 * HOUR);
        assert_eq!(
            policy.decide(AcquisitionMode::CacheOnly, old, now),
            CacheDecision::UseCache
        );
        assert_eq!(
            policy.decide(AcquisitionMode::CacheOnly, None, now),
            CacheDecision::Miss
        );
    }

    #[test]
    fn prefer_cache_refreshes_stale_entries() {
        let policy = FreshnessPolicy::default();
        let now = SystemTime::now();
        assert_eq!(
            policy.decide(AcquisitionMode::PreferCache, Some(now - HOUR), now),
            CacheDecision::UseCache
        );
        assert_eq!(
            policy.decide(AcquisitionMode::PreferCache, Some(now - 30 * HOUR), now),
            CacheDecision::Fetch
        );
        assert_eq!(
            policy.decide(AcquisitionMode::PreferCache, None, now),
            CacheDecision::Fetch
        );
    }

    #[test]
    fn force_refresh_always_fetches() {
        let policy = FreshnessPolicy::default();
        let now = SystemTime::now();
        assert_eq!(
            policy.decide(AcquisitionMode::ForceRefresh, Some(now), now),
            CacheDecision::Fetch
        );
        assert!(!AcquisitionMode::CacheOnly.allows_network());
        assert!(AcquisitionMode::ForceRefresh.allows_network());
    }
}
