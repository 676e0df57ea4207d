//! SQLite-backed event store.
//!
//! Each event is one row keyed by `internal_id`; the full record is kept
//! as JSON next to a few plain columns for inspection.

use super::merge::{resolve_write, WriteMode};
use crate::error::StoreError;
use crate::model::PersistedEvent;
use crate::terms::normalize_tag;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SqliteEventStore {
    db: Connection,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
        internal_id TEXT PRIMARY KEY,
        catalog_code TEXT NOT NULL,
        name TEXT NOT NULL,
        record TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS migrations (
        id TEXT PRIMARY KEY,
        applied_at TEXT NOT NULL
    );";

fn get_in(db: &Connection, internal_id: &str) -> Result<Option<PersistedEvent>, StoreError> {
    let result = db.query_row(
        "SELECT record FROM events WHERE internal_id = ?1",
        params![internal_id],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_in(
    db: &Connection,
    incoming: PersistedEvent,
    mode: WriteMode,
) -> Result<PersistedEvent, StoreError> {
    if incoming.internal_id().trim().is_empty() {
        return Err(StoreError::MissingId);
    }
    let existing = get_in(db, incoming.internal_id())?;
    let record = resolve_write(incoming, existing.as_ref(), mode)?;
    let json = serde_json::to_string(&record)?;
    db.execute(
        "INSERT INTO events (internal_id, catalog_code, name, record, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(internal_id) DO UPDATE SET
            catalog_code = excluded.catalog_code,
            name = excluded.name,
            record = excluded.record,
            updated_at = excluded.updated_at",
        params![
            record.internal_id(),
            record.stub().catalog_code,
            record.stub().name,
            json,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(record)
}

impl SqliteEventStore {
    /// Open or create a store file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(path)?;
        db.execute_batch(SCHEMA)?;
        debug!("opened event store at {}", path.display());
        Ok(Self { db })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Connection::open_in_memory()?;
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// Default store location: `~/.kitsquid/catalog.db`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".kitsquid")
            .join("catalog.db")
    }

    pub fn get(&self, internal_id: &str) -> Result<Option<PersistedEvent>, StoreError> {
        get_in(&self.db, internal_id)
    }

    /// Write one record and return what was stored.
    pub fn insert(
        &self,
        record: PersistedEvent,
        mode: WriteMode,
    ) -> Result<PersistedEvent, StoreError> {
        let tx = self.db.unchecked_transaction()?;
        let written = write_in(&tx, record, mode)?;
        tx.commit()?;
        Ok(written)
    }

    /// Write all records in one transaction. Any failure rolls the whole
    /// batch back.
    pub fn insert_multi(
        &self,
        records: Vec<PersistedEvent>,
        mode: WriteMode,
    ) -> Result<usize, StoreError> {
        let tx = self.db.unchecked_transaction()?;
        let mut written = 0usize;
        for record in records {
            write_in(&tx, record, mode)?;
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    /// Every stored record, ordered by catalog code.
    pub fn all(&self) -> Result<Vec<PersistedEvent>, StoreError> {
        let mut stmt = self
            .db
            .prepare("SELECT record FROM events ORDER BY catalog_code, internal_id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;
        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    /// Records tagged with `term` (any spelling).
    pub fn find_by_term(&self, term: &str) -> Result<Vec<PersistedEvent>, StoreError> {
        let tag = normalize_tag(term);
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| r.term_tags().iter().any(|t| normalize_tag(t) == tag))
            .collect())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn has_migration(&self, id: &str) -> Result<bool, StoreError> {
        let n: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM migrations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn record_migration(&self, id: &str) -> Result<(), StoreError> {
        self.db.execute(
            "INSERT OR REPLACE INTO migrations (id, applied_at) VALUES (?1, ?2)",
            params![id, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
