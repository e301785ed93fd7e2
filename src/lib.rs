// src/lib.rs

//! mediadex: a resumable media-channel crawler and ranked search catalog.
//!
//! The write path pulls messages from a [`source::MessageSource`] in
//! bounded windows, normalizes them and lands them in the
//! [`catalog::CatalogStore`], advancing a [`checkpoint::CheckpointStore`]
//! after every committed window. The read path serves paginated queries
//! through the [`search::QueryEngine`] fallback chain, memoized in a
//! [`cache::QueryCache`].

pub mod cache;
pub mod catalog;
pub mod checkpoint;
pub mod error;
pub mod indexer;
pub mod models;
pub mod normalize;
pub mod search;
pub mod source;
pub mod utils;
