// src/source.rs

//! Collaborator interfaces: the message source and the progress sink.
//!
//! The transport to the actual channel (and whatever renders progress to
//! an operator) live outside this crate; the indexer only ever talks to
//! these two traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ProgressSnapshot, RawMessage};

/// Paginated, pull-based access to a message channel.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch messages with ids in `[from, to]`, ascending.
    ///
    /// An empty result means the range holds nothing and the channel has
    /// no messages past `from` either — the crawl is done.
    ///
    /// Implementations must signal throttling with
    /// [`AppError::RateLimited`](crate::error::AppError::RateLimited) and
    /// permission problems with
    /// [`AppError::Unauthorized`](crate::error::AppError::Unauthorized);
    /// the indexer treats the former as retry-after-sleeping and the
    /// latter as fatal.
    async fn fetch_range(&self, source_id: i64, from: i64, to: i64) -> Result<Vec<RawMessage>>;
}

/// Fire-and-forget receiver for progress snapshots.
pub trait ProgressSink: Send + Sync {
    /// Called every few hundred processed items and on terminal
    /// transitions. Return value is intentionally `()`: the indexer never
    /// depends on the sink.
    fn report(&self, snapshot: &ProgressSnapshot);
}

/// A sink that drops every snapshot.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn report(&self, _snapshot: &ProgressSnapshot) {}
}
