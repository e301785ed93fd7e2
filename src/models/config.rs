//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Crawl/indexing behavior settings
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Query engine settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.indexer.window_size == 0 {
            return Err(AppError::validation("indexer.window_size must be > 0"));
        }
        if self.indexer.fetch_timeout_secs == 0 {
            return Err(AppError::validation(
                "indexer.fetch_timeout_secs must be > 0",
            ));
        }
        if self.indexer.max_fetch_attempts == 0 {
            return Err(AppError::validation(
                "indexer.max_fetch_attempts must be > 0",
            ));
        }
        if self.search.min_query_len < 2 {
            return Err(AppError::validation("search.min_query_len must be >= 2"));
        }
        if self.search.suggestion_threshold > 100 {
            return Err(AppError::validation(
                "search.suggestion_threshold must be <= 100",
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(AppError::validation("cache.ttl_secs must be > 0"));
        }
        Ok(())
    }
}

/// Crawl/indexing behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Messages fetched per window
    #[serde(default = "defaults::window_size")]
    pub window_size: u32,

    /// Emit a progress snapshot every this many processed items
    #[serde(default = "defaults::progress_interval")]
    pub progress_interval: u64,

    /// Deadline for a single fetch window, in seconds
    #[serde(default = "defaults::fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Attempts per window before the job fails (timeouts only)
    #[serde(default = "defaults::max_fetch_attempts")]
    pub max_fetch_attempts: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::window_size(),
            progress_interval: defaults::progress_interval(),
            fetch_timeout_secs: defaults::fetch_timeout(),
            max_fetch_attempts: defaults::max_fetch_attempts(),
        }
    }
}

/// Query engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Queries shorter than this (after normalization) return nothing
    #[serde(default = "defaults::min_query_len")]
    pub min_query_len: usize,

    /// Whether the substring fallback also scans captions
    #[serde(default = "defaults::search_captions")]
    pub search_captions: bool,

    /// Minimum 0-100 similarity before a fuzzy suggestion is followed
    #[serde(default = "defaults::suggestion_threshold")]
    pub suggestion_threshold: u8,

    /// Upper bound on remembered vocabulary terms
    #[serde(default = "defaults::vocabulary_cap")]
    pub vocabulary_cap: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: defaults::min_query_len(),
            search_captions: defaults::search_captions(),
            suggestion_threshold: defaults::suggestion_threshold(),
            vocabulary_cap: defaults::vocabulary_cap(),
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached result page stays valid, in seconds
    #[serde(default = "defaults::cache_ttl")]
    pub ttl_secs: u64,

    /// Background sweep interval, in seconds
    #[serde(default = "defaults::sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum number of cached pages
    #[serde(default = "defaults::cache_capacity")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::cache_ttl(),
            sweep_interval_secs: defaults::sweep_interval(),
            max_entries: defaults::cache_capacity(),
        }
    }
}

/// Default values for configuration.
mod defaults {
    pub fn window_size() -> u32 {
        200
    }

    pub fn progress_interval() -> u64 {
        50
    }

    pub fn fetch_timeout() -> u64 {
        30
    }

    pub fn max_fetch_attempts() -> u32 {
        3
    }

    pub fn min_query_len() -> usize {
        2
    }

    pub fn search_captions() -> bool {
        true
    }

    pub fn suggestion_threshold() -> u8 {
        60
    }

    pub fn vocabulary_cap() -> usize {
        8192
    }

    pub fn cache_ttl() -> u64 {
        300
    }

    pub fn sweep_interval() -> u64 {
        60
    }

    pub fn cache_capacity() -> usize {
        4096
    }
}
