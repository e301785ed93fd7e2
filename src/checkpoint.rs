// src/checkpoint.rs

//! Persistence for crawl progress checkpoints.
//!
//! One row per source, last-write-wins. Only one crawl job runs at a
//! time (see the indexer's advisory lock), so there is no conflict
//! resolution to do.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::catalog::schema;
use crate::error::{Result, classify_sqlite};
use crate::models::Checkpoint;

/// Store for per-source crawl cursors.
pub struct CheckpointStore {
    conn: Mutex<Connection>,
}

impl CheckpointStore {
    /// Open or create the checkpoint table at the given database path.
    ///
    /// May point at the catalog's database file; the schema is shared and
    /// initialization is idempotent.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(classify_sqlite)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(classify_sqlite)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Last committed cursor for a source, if any.
    pub fn get(&self, source_id: i64) -> Result<Option<i64>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT cursor FROM checkpoints WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(classify_sqlite)
    }

    /// Record the new cursor for a source, last-write-wins.
    pub fn set(&self, source_id: i64, cursor: i64) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO checkpoints (source_id, cursor, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(source_id) DO UPDATE SET cursor = excluded.cursor,
                                                  updated_at = excluded.updated_at",
            params![source_id, cursor, Utc::now().timestamp()],
        )
        .map_err(classify_sqlite)?;
        Ok(())
    }

    /// All known checkpoints.
    pub fn all(&self) -> Result<Vec<Checkpoint>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT source_id, cursor, updated_at FROM checkpoints ORDER BY source_id")
            .map_err(classify_sqlite)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Checkpoint {
                    source_id: row.get(0)?,
                    cursor: row.get(1)?,
                    updated_at: DateTime::from_timestamp(row.get(2)?, 0)
                        .unwrap_or(DateTime::UNIX_EPOCH),
                })
            })
            .map_err(classify_sqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify_sqlite)?;
        Ok(rows)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
