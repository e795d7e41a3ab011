//! Feedback persistence.
//!
//! Records are stored in SQLite with enum fields in their wire form and
//! timestamps as RFC 3339 text. [`MemoryStore`] backs tests and callers
//! that do not want a database file.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, TriageError};
use crate::record::{FeedbackRecord, PriorityAction, SentimentLabel, UrgencyLabel};

/// Storage backend for analyzed feedback records.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persists one record. Record ids are unique, so inserting the same
    /// record twice is an error.
    async fn insert(&self, record: &FeedbackRecord) -> Result<()>;

    /// All records for one owner, newest first.
    async fn records_for_owner(&self, owner_id: &str) -> Result<Vec<FeedbackRecord>>;

    /// Looks up a single record by id.
    async fn get(&self, id: &str) -> Result<Option<FeedbackRecord>>;
}

/// SQLite-backed store. One connection guarded by an async mutex, which
/// is enough for the sequential CLI workload.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, creating parent
    /// directories as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TriageError::Storage {
                message: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }

        info!("Opening feedback store at: {}", path.display());
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS feedback (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                text TEXT NOT NULL,
                domain TEXT NOT NULL,
                sentiment_label TEXT NOT NULL,
                sentiment_prob REAL NOT NULL,
                urgency_label TEXT NOT NULL,
                urgency_prob REAL NOT NULL,
                priority_action TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_feedback_owner ON feedback(owner_id);
            CREATE INDEX IF NOT EXISTS idx_feedback_created ON feedback(created_at);
            ",
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<FeedbackRecord> {
        let sentiment_raw: String = row.get(4)?;
        let urgency_raw: String = row.get(6)?;
        let action_raw: String = row.get(8)?;
        let created_raw: String = row.get(9)?;

        Ok(FeedbackRecord {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            text: row.get(2)?,
            domain: row.get(3)?,
            sentiment_label: SentimentLabel::from_wire(&sentiment_raw)
                .ok_or_else(|| invalid_column(4, &format!("bad sentiment '{sentiment_raw}'")))?,
            sentiment_prob: row.get(5)?,
            urgency_label: UrgencyLabel::from_wire(&urgency_raw)
                .ok_or_else(|| invalid_column(6, &format!("bad urgency '{urgency_raw}'")))?,
            urgency_prob: row.get(7)?,
            priority_action: PriorityAction::from_wire(&action_raw)
                .ok_or_else(|| invalid_column(8, &format!("bad action '{action_raw}'")))?,
            created_at: DateTime::parse_from_rfc3339(&created_raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| invalid_column(9, &format!("bad timestamp: {e}")))?,
        })
    }
}

fn invalid_column(idx: usize, message: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(io::Error::new(io::ErrorKind::InvalidData, message.to_string())),
    )
}

#[async_trait]
impl FeedbackStore for SqliteStore {
    async fn insert(&self, record: &FeedbackRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO feedback VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                record.owner_id,
                record.text,
                record.domain,
                record.sentiment_label.as_wire(),
                record.sentiment_prob as f64,
                record.urgency_label.as_wire(),
                record.urgency_prob as f64,
                record.priority_action.as_wire(),
                record.created_at.to_rfc3339(),
            ],
        )?;
        debug!(id = %record.id, "stored feedback record");
        Ok(())
    }

    async fn records_for_owner(&self, owner_id: &str) -> Result<Vec<FeedbackRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, text, domain, sentiment_label, sentiment_prob,
                    urgency_label, urgency_prob, priority_action, created_at
             FROM feedback WHERE owner_id = ?
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![owner_id], Self::row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<FeedbackRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, text, domain, sentiment_label, sentiment_prob,
                    urgency_label, urgency_prob, priority_action, created_at
             FROM feedback WHERE id = ?",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_record(row)?)),
            None => Ok(None),
        }
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert(&self, record: &FeedbackRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(TriageError::Storage {
                message: format!("duplicate record id {}", record.id),
            });
        }
        records.push(record.clone());
        Ok(())
    }

    async fn records_for_owner(&self, owner_id: &str) -> Result<Vec<FeedbackRecord>> {
        let records = self.records.lock().await;
        let mut matched: Vec<FeedbackRecord> = records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn get(&self, id: &str) -> Result<Option<FeedbackRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }
}
