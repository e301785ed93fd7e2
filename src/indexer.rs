// src/indexer.rs

//! Resumable channel indexing.
//!
//! One job system-wide: the service object owns an advisory lock and
//! rejects a second concurrent run outright. The scan walks the source
//! forward in bounded windows; after every committed window the
//! checkpoint advances (write-then-checkpoint, never the reverse), so a
//! crash between windows loses at most one window of work.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::catalog::{CatalogStore, InsertOutcome};
use crate::checkpoint::CheckpointStore;
use crate::error::{AppError, Result};
use crate::models::{
    Classified, FileRecord, IndexSummary, IndexerConfig, JobState, MediaKind, MediaPayload,
    ProgressSnapshot, Quality, RawMessage, classify, derive_record_id,
};
use crate::normalize;
use crate::source::{MessageSource, ProgressSink};

/// Shared counters and state of one indexing run.
struct JobStats {
    state: Mutex<JobState>,
    scanned: AtomicU64,
    saved: AtomicU64,
    duplicate: AtomicU64,
    errors: AtomicU64,
    non_media: AtomicU64,
    started: Mutex<Option<Instant>>,
}

impl JobStats {
    fn new() -> Self {
        Self {
            state: Mutex::new(JobState::Idle),
            scanned: AtomicU64::new(0),
            saved: AtomicU64::new(0),
            duplicate: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            non_media: AtomicU64::new(0),
            started: Mutex::new(None),
        }
    }

    fn set_state(&self, state: JobState) {
        *lock(&self.state) = state;
    }

    fn mark_started(&self) {
        *lock(&self.started) = Some(Instant::now());
        self.set_state(JobState::Running);
    }

    fn elapsed(&self) -> Duration {
        lock(&self.started).map(|s| s.elapsed()).unwrap_or_default()
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            state: *lock(&self.state),
            scanned: self.scanned.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            non_media: self.non_media.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }

    fn summary(&self) -> IndexSummary {
        IndexSummary {
            scanned: self.scanned.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            non_media: self.non_media.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Channel crawler and catalog writer.
pub struct Indexer {
    source: Arc<dyn MessageSource>,
    catalog: Arc<CatalogStore>,
    checkpoints: Arc<CheckpointStore>,
    sink: Arc<dyn ProgressSink>,
    config: IndexerConfig,
    busy: AtomicBool,
    cancel_requested: AtomicBool,
}

impl Indexer {
    /// Build an indexer around its injected collaborators.
    pub fn new(
        source: Arc<dyn MessageSource>,
        catalog: Arc<CatalogStore>,
        checkpoints: Arc<CheckpointStore>,
        sink: Arc<dyn ProgressSink>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            source,
            catalog,
            checkpoints,
            sink,
            config,
            busy: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
        }
    }

    /// Try to take the advisory lock. Public so the single-job contract
    /// is testable on its own.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the advisory lock and clear any pending cancellation.
    pub fn release(&self) {
        self.cancel_requested.store(false, Ordering::Release);
        self.busy.store(false, Ordering::Release);
    }

    /// Ask the running job to stop at the next window boundary.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    /// Spawn an indexing job and return a handle to watch it.
    pub fn start(self: Arc<Self>, source_id: i64, start_cursor: i64, skip: u64) -> JobHandle {
        let stats = Arc::new(JobStats::new());
        let indexer = Arc::clone(&self);
        let job_stats = Arc::clone(&stats);

        let join = tokio::spawn(async move {
            indexer
                .run_with_stats(source_id, start_cursor, skip, &job_stats)
                .await
        });

        JobHandle {
            indexer: self,
            stats,
            join,
        }
    }

    /// Run an indexing job to completion on the current task.
    pub async fn run(&self, source_id: i64, start_cursor: i64, skip: u64) -> Result<IndexSummary> {
        let stats = JobStats::new();
        self.run_with_stats(source_id, start_cursor, skip, &stats)
            .await
    }

    async fn run_with_stats(
        &self,
        source_id: i64,
        start_cursor: i64,
        skip: u64,
        stats: &JobStats,
    ) -> Result<IndexSummary> {
        if !self.try_acquire() {
            return Err(AppError::Busy);
        }
        let _guard = LockGuard { indexer: self };

        stats.mark_started();
        log::info!("indexing source {source_id} from cursor {start_cursor} (skip {skip})");

        let result = self.scan(source_id, start_cursor, skip, stats).await;

        match &result {
            Ok(()) => {
                let state = *lock(&stats.state);
                log::info!("indexing source {source_id} finished: {state:?}");
            }
            Err(e) => {
                stats.set_state(JobState::Failed);
                log::error!("indexing source {source_id} failed: {e}");
            }
        }
        self.sink.report(&stats.snapshot());

        result.map(|()| stats.summary())
    }

    /// The window loop. Sets the terminal state on success; the caller
    /// maps errors to `Failed`.
    async fn scan(
        &self,
        source_id: i64,
        start_cursor: i64,
        skip: u64,
        stats: &JobStats,
    ) -> Result<()> {
        let mut cursor = start_cursor;
        if let Some(checkpoint) = self.checkpoints.get(source_id)? {
            if checkpoint > cursor {
                log::info!("resuming source {source_id} from checkpoint {checkpoint}");
                cursor = checkpoint;
            }
        }

        let mut remaining_skip = skip;
        let mut since_report: u64 = 0;

        loop {
            if self.cancel_requested.load(Ordering::Acquire) {
                log::info!("cancellation observed, stopping at cursor {cursor}");
                stats.set_state(JobState::Cancelled);
                return Ok(());
            }

            let from = cursor + 1;
            let to = cursor + i64::from(self.config.window_size);
            let batch = self.fetch_window(source_id, from, to).await?;

            let Some(last) = batch.last() else {
                stats.set_state(JobState::Completed);
                return Ok(());
            };
            let window_end = last.id;

            for message in &batch {
                stats.scanned.fetch_add(1, Ordering::Relaxed);
                since_report += 1;

                if remaining_skip > 0 {
                    remaining_skip -= 1;
                } else {
                    self.process_message(message, stats)?;
                }

                if since_report >= self.config.progress_interval {
                    since_report = 0;
                    self.sink.report(&stats.snapshot());
                }
            }

            // The window is fully written; only now may the checkpoint
            // move past it.
            cursor = window_end.max(cursor);
            self.checkpoints.set(source_id, cursor)?;
        }
    }

    /// Classify one message and write it to the catalog, mapping the
    /// outcome onto the job counters. Only a dead store aborts the job.
    fn process_message(&self, message: &RawMessage, stats: &JobStats) -> Result<()> {
        let caption = message.caption.as_deref().unwrap_or("");

        let record = match classify(message) {
            Classified::Video(media) => build_record(media, caption, true),
            Classified::Document(media) => build_record(media, caption, false),
            Classified::Unsupported => {
                stats.non_media.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        };

        match self.catalog.insert(&record) {
            Ok(InsertOutcome::Created) => {
                stats.saved.fetch_add(1, Ordering::Relaxed);
            }
            Ok(InsertOutcome::Duplicate) => {
                stats.duplicate.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.is_job_fatal() => return Err(e),
            Err(e) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                log::warn!("failed to save message {}: {e}", message.id);
            }
        }
        Ok(())
    }

    /// Fetch one window, honoring rate limits and the per-window
    /// deadline. Rate-limit sleeps retry forever (the source told us
    /// when to come back); timeouts are bounded.
    async fn fetch_window(&self, source_id: i64, from: i64, to: i64) -> Result<Vec<RawMessage>> {
        let deadline = Duration::from_secs(self.config.fetch_timeout_secs);
        let mut attempts: u32 = 0;

        loop {
            let fetch = self.source.fetch_range(source_id, from, to);
            match tokio::time::timeout(deadline, fetch).await {
                Ok(Ok(batch)) => return Ok(batch),
                Ok(Err(AppError::RateLimited { retry_after_secs })) => {
                    log::info!("rate limited on [{from}, {to}], sleeping {retry_after_secs}s");
                    tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                }
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => {
                    attempts += 1;
                    if attempts >= self.config.max_fetch_attempts {
                        return Err(AppError::FetchTimeout { from, to, attempts });
                    }
                    log::warn!(
                        "fetch window [{from}, {to}] timed out (attempt {attempts}), retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(u64::from(attempts))).await;
                }
            }
        }
    }

    /// Index one message outside a crawl, e.g. a single forwarded file.
    /// Takes no lock and touches no checkpoint.
    pub fn index_single(&self, message: &RawMessage) -> Result<Option<InsertOutcome>> {
        let caption = message.caption.as_deref().unwrap_or("");
        let record = match classify(message) {
            Classified::Video(media) => build_record(media, caption, true),
            Classified::Document(media) => build_record(media, caption, false),
            Classified::Unsupported => return Ok(None),
        };
        self.catalog.insert(&record).map(Some)
    }

    /// React to an edited caption: refresh the stored caption and, for
    /// videos, re-detect the quality tag. Returns false for unknown media.
    pub fn apply_caption_edit(&self, media: &MediaPayload, caption: &str) -> Result<bool> {
        let id = derive_record_id(media);
        if self.catalog.get(&id)?.is_none() {
            return Ok(false);
        }

        self.catalog.update_caption(&id, caption)?;
        if media.kind == MediaKind::Video {
            let quality = normalize::detect_quality(&format!("{} {caption}", media.file_name));
            self.catalog.update_quality(&id, quality)?;
        }
        Ok(true)
    }
}

/// Releases the advisory lock on every exit path.
struct LockGuard<'a> {
    indexer: &'a Indexer,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.indexer.release();
    }
}

/// Handle to a spawned indexing job.
pub struct JobHandle {
    indexer: Arc<Indexer>,
    stats: Arc<JobStats>,
    join: tokio::task::JoinHandle<Result<IndexSummary>>,
}

impl JobHandle {
    /// Ask the job to stop at the next window boundary.
    pub fn cancel(&self) {
        self.indexer.request_cancel();
    }

    /// Current counters and state.
    pub fn status(&self) -> ProgressSnapshot {
        self.stats.snapshot()
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<IndexSummary> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(AppError::source("index job", e)),
        }
    }
}

/// Turn a classified media payload into a catalog record.
fn build_record(media: &MediaPayload, caption: &str, detect_quality: bool) -> FileRecord {
    let normalized = normalize::normalize(&media.file_name, caption);
    let quality = if detect_quality {
        normalized.quality
    } else {
        Quality::Unknown
    };
    let now = Utc::now();

    FileRecord {
        id: derive_record_id(media),
        name: normalize::display_name(&media.file_name),
        search_tokens: normalized.search_tokens,
        caption: caption.to_string(),
        size_bytes: media.size_bytes,
        quality,
        indexed_at: now,
        updated_at: now,
    }
}
