//! End-to-end tests: crawl a scripted channel, then query the catalog
//! through the full fallback chain.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mediadex::cache::QueryCache;
use mediadex::catalog::CatalogStore;
use mediadex::checkpoint::CheckpointStore;
use mediadex::error::Result;
use mediadex::indexer::Indexer;
use mediadex::models::{Config, IndexerConfig, MediaKind, MediaPayload, RawMessage};
use mediadex::search::{QueryEngine, Vocabulary};
use mediadex::source::{MessageSource, NullProgressSink};

/// A channel whose history is a plain vector of messages.
struct ChannelFixture {
    messages: Vec<RawMessage>,
}

#[async_trait]
impl MessageSource for ChannelFixture {
    async fn fetch_range(&self, _source_id: i64, from: i64, to: i64) -> Result<Vec<RawMessage>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| m.id >= from && m.id <= to)
            .cloned()
            .collect())
    }
}

fn video(id: i64, name: &str, caption: &str) -> RawMessage {
    RawMessage {
        id,
        media: Some(MediaPayload {
            kind: MediaKind::Video,
            file_name: name.to_string(),
            size_bytes: 300 * 1024 * 1024 + id as u64,
            dc_id: 4,
            media_id: 77_000 + id,
            access_hash: id.wrapping_mul(104_729),
        }),
        caption: if caption.is_empty() {
            None
        } else {
            Some(caption.to_string())
        },
    }
}

fn document(id: i64, name: &str) -> RawMessage {
    RawMessage {
        id,
        media: Some(MediaPayload {
            kind: MediaKind::Document,
            file_name: name.to_string(),
            size_bytes: 2 * 1024 * 1024,
            dc_id: 4,
            media_id: 77_000 + id,
            access_hash: id.wrapping_mul(104_729),
        }),
        caption: None,
    }
}

fn chatter(id: i64) -> RawMessage {
    RawMessage {
        id,
        media: None,
        caption: Some("discussion".to_string()),
    }
}

fn channel_history() -> Vec<RawMessage> {
    vec![
        video(1, "Alpha.2024.1080p.mkv", ""),
        video(2, "Alpha.2024.720p.mkv", ""),
        chatter(3),
        video(4, "Interstellar.2014.2160p.mkv", "remux"),
        document(5, "Course.Handbook.pdf"),
        document(6, "malware.exe"),
        video(7, "Beta.Finale.480p.mkv", "season finale"),
    ]
}

fn indexer_over(
    source: Vec<RawMessage>,
    catalog: &Arc<CatalogStore>,
    checkpoints: &Arc<CheckpointStore>,
) -> Indexer {
    Indexer::new(
        Arc::new(ChannelFixture { messages: source }),
        Arc::clone(catalog),
        Arc::clone(checkpoints),
        Arc::new(NullProgressSink),
        IndexerConfig {
            window_size: 3,
            ..IndexerConfig::default()
        },
    )
}

fn engine_over(catalog: &Arc<CatalogStore>) -> QueryEngine {
    let config = Config::default();
    config.validate().unwrap();

    let cache = QueryCache::new(
        Duration::from_secs(config.cache.ttl_secs),
        config.cache.max_entries,
    );
    let engine = QueryEngine::new(
        Arc::clone(catalog),
        Arc::new(cache),
        Vocabulary::new(config.search.vocabulary_cap),
        config.search,
    );
    engine.seed_vocabulary(512).unwrap();
    engine
}

#[tokio::test]
async fn crawl_then_query_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("catalog.db");
    let catalog = Arc::new(CatalogStore::open(&db).unwrap());
    let checkpoints = Arc::new(CheckpointStore::open(&db).unwrap());

    let summary = indexer_over(channel_history(), &catalog, &checkpoints)
        .run(900, 0, 0)
        .await
        .unwrap();

    assert_eq!(summary.scanned, 7);
    assert_eq!(summary.saved, 5); // 4 videos + 1 pdf
    assert_eq!(summary.non_media, 2); // chatter + exe
    assert_eq!(summary.errors, 0);

    let engine = engine_over(&catalog);

    // both Alphas come back ranked on a single page
    let page = engine.search("alpha", 0, 10).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.next_offset, None);
    assert!(page.records.iter().any(|r| r.name == "Alpha 2024 1080p"));

    // caption tokens are searchable
    let page = engine.search("finale", 0, 10).unwrap();
    assert_eq!(page.total, 1);

    // documents land with unknown quality
    let page = engine.search("handbook", 0, 10).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].quality.as_str(), "unknown");
}

#[tokio::test]
async fn crash_and_resume_does_not_reprocess() {
    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("catalog.db");
    let catalog = Arc::new(CatalogStore::open(&db).unwrap());
    let checkpoints = Arc::new(CheckpointStore::open(&db).unwrap());

    let full = channel_history();

    // First run sees only the first window's worth of history, as if the
    // process died right after committing it.
    let partial: Vec<RawMessage> = full.iter().filter(|m| m.id <= 3).cloned().collect();
    let first = indexer_over(partial, &catalog, &checkpoints)
        .run(900, 0, 0)
        .await
        .unwrap();
    assert_eq!(first.saved, 2);
    assert_eq!(checkpoints.get(900).unwrap(), Some(3));

    // Restart against the full history: resumes past the checkpoint.
    let second = indexer_over(full.clone(), &catalog, &checkpoints)
        .run(900, 0, 0)
        .await
        .unwrap();
    assert_eq!(second.scanned, 4);
    assert_eq!(second.saved, 3);
    assert_eq!(second.duplicate, 0);

    // A deliberate full re-crawl (fresh checkpoints) only finds
    // duplicates: the same physical file never yields two records.
    let rewind = Arc::new(CheckpointStore::open_in_memory().unwrap());
    let third = indexer_over(full, &catalog, &rewind)
        .run(900, 0, 0)
        .await
        .unwrap();
    assert_eq!(third.saved, 0);
    assert_eq!(third.duplicate, 5);
    assert_eq!(catalog.count().unwrap(), 5);
}

#[tokio::test]
async fn typo_query_recovers_through_fuzzy_tier() {
    let catalog = Arc::new(CatalogStore::open_in_memory().unwrap());
    let checkpoints = Arc::new(CheckpointStore::open_in_memory().unwrap());
    indexer_over(channel_history(), &catalog, &checkpoints)
        .run(900, 0, 0)
        .await
        .unwrap();

    let engine = engine_over(&catalog);
    let page = engine.search("intersteller", 0, 10).unwrap();
    assert_eq!(page.total, 1);
    assert!(page.records[0].name.starts_with("Interstellar"));
}

#[tokio::test]
async fn search_page_serializes_to_ui_wire_shape() {
    let catalog = Arc::new(CatalogStore::open_in_memory().unwrap());
    let checkpoints = Arc::new(CheckpointStore::open_in_memory().unwrap());
    indexer_over(channel_history(), &catalog, &checkpoints)
        .run(900, 0, 0)
        .await
        .unwrap();

    let engine = engine_over(&catalog);
    let page = engine.search("alpha", 0, 1).unwrap();
    let json = serde_json::to_value(&page).unwrap();

    assert_eq!(json["total"], 2);
    assert_eq!(json["nextOffset"], 1);
    assert_eq!(json["records"].as_array().unwrap().len(), 1);

    let record = &json["records"][0];
    assert!(record["id"].is_string());
    assert!(record["sizeBytes"].is_u64());
    assert!(record["quality"].is_string());
    assert!(record["searchTokens"].is_string());
}
