//! Failure kinds surfaced by catalog acquisition and lookup.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no font sources are enabled")]
    NoSourcesEnabled,

    #[error("no cached sources available: {}", .failures.join("; "))]
    NoCachedSourcesAvailable { failures: Vec<String> },

    #[error("failed to load any font source: {}", .failures.join("; "))]
    NoSourcesLoaded { failures: Vec<String> },

    #[error("no cached data for source {source_name}")]
    CacheMiss { source_name: String },

    #[error("failed to fetch source {source_name}: {reason}")]
    FetchFailed { source_name: String, reason: String },

    #[error("font not found: {id}")]
    FontNotFound { id: String },
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
