//! SQLite-backed catalog of indexed media files.
//!
//! Writes go through one connection, reads through another, so the query
//! path never waits behind a write-heavy crawl (WAL keeps both sides
//! consistent). Every operation is single-row atomic; there are no
//! multi-record transactions to roll back.

pub mod schema;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::error::{Result, classify_sqlite};
use crate::models::{FileRecord, Quality};

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was written
    Created,
    /// The id was already present; mutable fields were refreshed
    Duplicate,
}

/// Persistent collection of file records with a ranked text index.
pub struct CatalogStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

static MEM_DB_SEQ: AtomicU64 = AtomicU64::new(0);

impl CatalogStore {
    /// Open or create a catalog at the given path with WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = Connection::open(path).map_err(classify_sqlite)?;
        writer
            .pragma_update(None, "journal_mode", "WAL")
            .map_err(classify_sqlite)?;
        schema::initialize(&writer)?;

        let reader = Connection::open(path).map_err(classify_sqlite)?;
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    /// Open an in-memory catalog (for testing).
    ///
    /// Uses a uniquely named shared-cache database so the reader and
    /// writer connections see the same data.
    pub fn open_in_memory() -> Result<Self> {
        let n = MEM_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:mediadex_mem_{n}?mode=memory&cache=shared");
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;

        let writer = Connection::open_with_flags(&uri, flags).map_err(classify_sqlite)?;
        schema::initialize(&writer)?;
        let reader = Connection::open_with_flags(&uri, flags).map_err(classify_sqlite)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    /// Insert a record, or refresh the mutable fields of an existing one.
    ///
    /// Duplicate detection is solely by `id`. The duplicate path touches
    /// `caption`, `quality` and `updated_at` only; `id`, `name`,
    /// `search_tokens` and `indexed_at` keep their first-sight values.
    pub fn insert(&self, record: &FileRecord) -> Result<InsertOutcome> {
        let conn = lock(&self.writer);

        let exists: Option<i64> = conn
            .query_row(
                "SELECT rowid FROM files WHERE id = ?1",
                params![record.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(classify_sqlite)?;

        if exists.is_some() {
            conn.execute(
                "UPDATE files SET caption = ?1, quality = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    record.caption,
                    record.quality.as_str(),
                    record.updated_at.timestamp(),
                    record.id
                ],
            )
            .map_err(classify_sqlite)?;
            return Ok(InsertOutcome::Duplicate);
        }

        conn.execute(
            "INSERT INTO files (id, name, search_tokens, caption, size_bytes, quality, indexed_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.name,
                record.search_tokens,
                record.caption,
                record.size_bytes as i64,
                record.quality.as_str(),
                record.indexed_at.timestamp(),
                record.updated_at.timestamp()
            ],
        )
        .map_err(classify_sqlite)?;

        Ok(InsertOutcome::Created)
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Result<Option<FileRecord>> {
        let conn = lock(&self.reader);
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM files WHERE id = ?1"),
            params![id],
            map_record,
        )
        .optional()
        .map_err(classify_sqlite)
    }

    /// Ranked text search over the FTS index.
    ///
    /// Tokens are OR-joined the way the original text index matched, and
    /// results are ordered by bm25 relevance with the id as tie-break so
    /// pagination over a fixed catalog never repeats or skips a record.
    pub fn search(&self, tokens: &str, offset: u64, limit: u64) -> Result<(Vec<FileRecord>, u64)> {
        let Some(match_expr) = fts_match_expr(tokens) else {
            return Ok((Vec::new(), 0));
        };

        let conn = lock(&self.reader);

        let total: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM files_fts WHERE files_fts MATCH ?1",
                params![match_expr],
                |row| row.get::<_, i64>(0),
            )
            .map_err(classify_sqlite)? as u64;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS_F} FROM files f
                 JOIN files_fts ON files_fts.rowid = f.rowid
                 WHERE files_fts MATCH ?1
                 ORDER BY bm25(files_fts), f.id
                 LIMIT ?2 OFFSET ?3"
            ))
            .map_err(classify_sqlite)?;

        let records = stmt
            .query_map(params![match_expr, limit as i64, offset as i64], map_record)
            .map_err(classify_sqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify_sqlite)?;

        Ok((records, total))
    }

    /// Literal substring fallback over name (and optionally caption),
    /// case-insensitive. Used only when the ranked search comes up empty.
    pub fn search_substring(
        &self,
        pattern: &str,
        offset: u64,
        limit: u64,
        include_caption: bool,
    ) -> Result<(Vec<FileRecord>, u64)> {
        let like = format!("%{}%", escape_like(pattern));
        let where_clause = if include_caption {
            "f.name LIKE ?1 ESCAPE '\\' OR f.caption LIKE ?1 ESCAPE '\\'"
        } else {
            "f.name LIKE ?1 ESCAPE '\\'"
        };

        let conn = lock(&self.reader);

        let total: u64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM files f WHERE {where_clause}"),
                params![like],
                |row| row.get::<_, i64>(0),
            )
            .map_err(classify_sqlite)? as u64;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS_F} FROM files f
                 WHERE {where_clause}
                 ORDER BY f.id
                 LIMIT ?2 OFFSET ?3"
            ))
            .map_err(classify_sqlite)?;

        let records = stmt
            .query_map(params![like, limit as i64, offset as i64], map_record)
            .map_err(classify_sqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify_sqlite)?;

        Ok((records, total))
    }

    /// Purge every record whose name contains the keyword. Returns the
    /// number of rows removed.
    pub fn delete_matching(&self, keyword: &str) -> Result<usize> {
        let like = format!("%{}%", escape_like(keyword));
        let conn = lock(&self.writer);
        conn.execute(
            "DELETE FROM files WHERE name LIKE ?1 ESCAPE '\\'",
            params![like],
        )
        .map_err(classify_sqlite)
    }

    /// Replace a record's caption, bumping `updated_at`.
    pub fn update_caption(&self, id: &str, caption: &str) -> Result<bool> {
        let conn = lock(&self.writer);
        let changed = conn
            .execute(
                "UPDATE files SET caption = ?1, updated_at = ?2 WHERE id = ?3",
                params![caption, Utc::now().timestamp(), id],
            )
            .map_err(classify_sqlite)?;
        Ok(changed > 0)
    }

    /// Replace a record's quality tag, bumping `updated_at`.
    pub fn update_quality(&self, id: &str, quality: Quality) -> Result<bool> {
        let conn = lock(&self.writer);
        let changed = conn
            .execute(
                "UPDATE files SET quality = ?1, updated_at = ?2 WHERE id = ?3",
                params![quality.as_str(), Utc::now().timestamp(), id],
            )
            .map_err(classify_sqlite)?;
        Ok(changed > 0)
    }

    /// Total number of records in the catalog.
    pub fn count(&self) -> Result<u64> {
        let conn = lock(&self.reader);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .map_err(classify_sqlite)?;
        Ok(count as u64)
    }

    /// Distinct tokens from the most recently updated records, newest
    /// first. Seeds the query engine's suggestion vocabulary.
    pub fn recent_tokens(&self, limit: usize) -> Result<Vec<String>> {
        let conn = lock(&self.reader);
        let mut stmt = conn
            .prepare("SELECT search_tokens FROM files ORDER BY updated_at DESC LIMIT ?1")
            .map_err(classify_sqlite)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| row.get::<_, String>(0))
            .map_err(classify_sqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify_sqlite)?;

        let mut seen = std::collections::HashSet::new();
        let mut tokens = Vec::new();
        for line in rows {
            for token in line.split_whitespace() {
                if seen.insert(token.to_string()) {
                    tokens.push(token.to_string());
                }
            }
        }
        Ok(tokens)
    }
}

const RECORD_COLUMNS: &str =
    "id, name, search_tokens, caption, size_bytes, quality, indexed_at, updated_at";

const RECORD_COLUMNS_F: &str =
    "f.id, f.name, f.search_tokens, f.caption, f.size_bytes, f.quality, f.indexed_at, f.updated_at";

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        search_tokens: row.get(2)?,
        caption: row.get(3)?,
        size_bytes: row.get::<_, i64>(4)? as u64,
        quality: Quality::parse(&row.get::<_, String>(5)?),
        indexed_at: timestamp(row.get(6)?),
        updated_at: timestamp(row.get(7)?),
    })
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Recover from lock poisoning: the store holds no in-memory invariants,
/// SQLite itself stays consistent.
fn lock(mutex: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build an FTS5 MATCH expression: each token quoted, OR-joined.
/// Returns `None` for input with no usable tokens.
fn fts_match_expr(tokens: &str) -> Option<String> {
    let quoted: Vec<String> = tokens
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect();

    if quoted.is_empty() {
        None
    } else {
        Some(quoted.join(" OR "))
    }
}

/// Escape LIKE wildcards in a user-supplied pattern.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
