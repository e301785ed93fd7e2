//! SQLite schema for the catalog database.
//!
//! The ranked text index is an external-content FTS5 table kept in sync
//! with `files` by triggers, so every write path (insert, re-index,
//! caption edit, purge) maintains the index without extra bookkeeping.

use rusqlite::Connection;

use crate::error::Result;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS files (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            search_tokens TEXT NOT NULL,
            caption       TEXT NOT NULL DEFAULT '',
            size_bytes    INTEGER NOT NULL,
            quality       TEXT NOT NULL,
            indexed_at    INTEGER NOT NULL,
            updated_at    INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_files_quality ON files(quality);
        CREATE INDEX IF NOT EXISTS idx_files_updated_at ON files(updated_at);

        CREATE VIRTUAL TABLE IF NOT EXISTS files_fts USING fts5(
            search_tokens,
            caption,
            content='files',
            content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS files_ai AFTER INSERT ON files BEGIN
            INSERT INTO files_fts(rowid, search_tokens, caption)
            VALUES (new.rowid, new.search_tokens, new.caption);
        END;

        CREATE TRIGGER IF NOT EXISTS files_ad AFTER DELETE ON files BEGIN
            INSERT INTO files_fts(files_fts, rowid, search_tokens, caption)
            VALUES ('delete', old.rowid, old.search_tokens, old.caption);
        END;

        CREATE TRIGGER IF NOT EXISTS files_au AFTER UPDATE ON files BEGIN
            INSERT INTO files_fts(files_fts, rowid, search_tokens, caption)
            VALUES ('delete', old.rowid, old.search_tokens, old.caption);
            INSERT INTO files_fts(rowid, search_tokens, caption)
            VALUES (new.rowid, new.search_tokens, new.caption);
        END;

        CREATE TABLE IF NOT EXISTS checkpoints (
            source_id  INTEGER PRIMARY KEY,
            cursor     INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}
