//! Multi-tier query engine.
//!
//! Resolution order: cache, ranked text match, literal substring scan,
//! fuzzy suggestion. Each step runs only when the previous one produced
//! nothing, and the fuzzy step re-enters the chain at most once.

pub mod fuzzy;

use std::sync::{Arc, Mutex};

use crate::cache::QueryCache;
use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::models::{SearchConfig, SearchPage};
use crate::normalize;

pub use fuzzy::{Vocabulary, similarity};

/// Per-call knobs for the fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Whether the substring fallback also scans captions
    pub include_captions: bool,
}

/// Ranked search with fallbacks over the catalog.
pub struct QueryEngine {
    catalog: Arc<CatalogStore>,
    cache: Arc<QueryCache>,
    vocabulary: Mutex<Vocabulary>,
    config: SearchConfig,
}

impl QueryEngine {
    /// Build an engine around its injected dependencies.
    pub fn new(
        catalog: Arc<CatalogStore>,
        cache: Arc<QueryCache>,
        vocabulary: Vocabulary,
        config: SearchConfig,
    ) -> Self {
        Self {
            catalog,
            cache,
            vocabulary: Mutex::new(vocabulary),
            config,
        }
    }

    /// Pre-load the suggestion vocabulary from recently indexed records.
    /// Returns the number of terms known afterwards.
    pub fn seed_vocabulary(&self, sample: usize) -> Result<usize> {
        let tokens = self.catalog.recent_tokens(sample)?;
        let mut vocab = self.lock_vocabulary();
        for token in tokens {
            vocab.learn(&token);
        }
        Ok(vocab.len())
    }

    /// Search with the configured caption scope.
    pub fn search(&self, raw_query: &str, offset: u64, limit: u64) -> Result<SearchPage> {
        self.search_with_options(
            raw_query,
            offset,
            limit,
            SearchOptions {
                include_captions: self.config.search_captions,
            },
        )
    }

    /// Search with caller-chosen options.
    pub fn search_with_options(
        &self,
        raw_query: &str,
        offset: u64,
        limit: u64,
        options: SearchOptions,
    ) -> Result<SearchPage> {
        let query = normalize::normalize_text(raw_query);
        if query.chars().count() < self.config.min_query_len {
            return Ok(SearchPage::empty());
        }
        self.execute(&query, offset, limit, options, true)
    }

    fn execute(
        &self,
        query: &str,
        offset: u64,
        limit: u64,
        options: SearchOptions,
        allow_suggestion: bool,
    ) -> Result<SearchPage> {
        if let Some(page) = self.cache.get(query, offset) {
            log::debug!("cache hit for '{query}' offset {offset}");
            return Ok(page);
        }

        // Tier 1: ranked text match.
        let (records, total) = self.catalog.search(query, offset, limit)?;
        if total > 0 {
            return Ok(self.finish(query, offset, limit, records, total));
        }

        // Tier 2: literal substring scan.
        let (records, total) =
            self.catalog
                .search_substring(query, offset, limit, options.include_captions)?;
        if total > 0 {
            return Ok(self.finish(query, offset, limit, records, total));
        }

        // Tier 3: fuzzy suggestion, re-entering the chain exactly once.
        if allow_suggestion {
            let suggestion = self
                .lock_vocabulary()
                .suggest(query, self.config.suggestion_threshold);
            if let Some(corrected) = suggestion {
                log::info!("no hits for '{query}', retrying as '{corrected}'");
                let page = self.execute(&corrected, offset, limit, options, false)?;
                // Remember the outcome under the original spelling too.
                self.cache.insert(query, offset, page.clone());
                return Ok(page);
            }
        }

        let page = SearchPage::empty();
        self.cache.insert(query, offset, page.clone());
        Ok(page)
    }

    /// Assemble, learn from and cache a non-empty result.
    fn finish(
        &self,
        query: &str,
        offset: u64,
        limit: u64,
        records: Vec<crate::models::FileRecord>,
        total: u64,
    ) -> SearchPage {
        {
            let mut vocab = self.lock_vocabulary();
            vocab.learn(query);
            for record in &records {
                vocab.learn(&record.search_tokens);
            }
        }

        let page = SearchPage::assemble(records, offset, limit, total);
        self.cache.insert(query, offset, page.clone());
        page
    }

    fn lock_vocabulary(&self) -> std::sync::MutexGuard<'_, Vocabulary> {
        self.vocabulary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
