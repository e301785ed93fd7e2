//! Crawl progress checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Saved progress marker for one source channel.
///
/// The crawler persists the highest fully committed cursor after every
/// window, so a crash between windows loses at most one window of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    /// Source channel identifier
    pub source_id: i64,

    /// Highest message id whose window has been committed
    pub cursor: i64,

    /// When the checkpoint was last advanced
    pub updated_at: DateTime<Utc>,
}
