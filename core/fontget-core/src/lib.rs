//! fontget-core: the font catalog behind fontget's search, list and install
//!
//! Several upstream sources (Google Fonts, Nerd Fonts, Font Squirrel, or any
//! custom JSON feed) publish font metadata independently. This crate fetches
//! them, keeps a per-source JSON cache with a 24 hour freshness window, merges
//! them into one manifest where every font is addressed by a CatalogID of
//! the form `{prefix}.{key}`, and answers free-text queries with a
//! deterministic ranking.
//!
//! ## Pipeline
//!
//! - [`cache::CacheStore`] reads and writes one cache file per source.
//! - [`freshness::FreshnessPolicy`] decides between cache and network for
//!   an [`freshness::AcquisitionMode`].
//! - [`fetch::SourceFetcher`] obtains a dataset, falling back to any cached
//!   copy when the network fails.
//! - [`manifest::ManifestBuilder`] fans out over enabled sources and merges.
//! - [`repository::Repository`] scores with [`score::score_font`] and
//!   orders hits with [`rank::rank_results`].
//! - [`matching::FamilyIndex`] maps installed family names back to
//!   CatalogIDs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fontget_core::config::{CatalogSettings, SourcesConfig};
//! use fontget_core::repository::Repository;
//!
//! let sources = SourcesConfig::default();
//! let settings = CatalogSettings::from_env()?;
//! let repo = Repository::cached(&sources, &settings)?;
//!
//! for hit in repo.search_fonts("roboto", "") {
//!     println!("{:<32} {}", hit.catalog_id, hit.name);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod freshness;
pub mod http;
pub mod manifest;
pub mod matching;
pub mod model;
pub mod output;
pub mod rank;
pub mod repository;
pub mod score;
