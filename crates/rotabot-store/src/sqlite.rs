//! SQLite history store.
//!
//! One flat `history` table mirroring `HistoryRecord`. Reads are a
//! full-table scan by design — the resolver filters by rota client
//! side, and history volume is one record per duty window.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use rotabot_core::error::{Result, RotaBotError};
use rotabot_core::traits::HistoryStore;
use rotabot_core::types::HistoryRecord;

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(map_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (
                id TEXT PRIMARY KEY,
                rota_id TEXT NOT NULL,
                end_time TEXT NOT NULL,
                assignee TEXT NOT NULL
            );",
        )
        .map_err(map_err)?;

        tracing::debug!("history store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-process, non-durable store. Test convenience.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(map_err)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (
                id TEXT PRIMARY KEY,
                rota_id TEXT NOT NULL,
                end_time TEXT NOT NULL,
                assignee TEXT NOT NULL
            );",
        )
        .map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn record_count(&self) -> usize {
        let conn = match self.conn.lock() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM history", [], |r| r.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn scan_all(&self) -> Result<Vec<HistoryRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RotaBotError::StoreInternal(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT id, rota_id, end_time, assignee FROM history")
            .map_err(map_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(map_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, rota_id, end_time, assignee) = row.map_err(map_err)?;
            // A record with an unparseable timestamp is corrupt; skip
            // it rather than poisoning every resolve.
            match parse_time(&end_time) {
                Some(end_time) => records.push(HistoryRecord {
                    id,
                    rota_id,
                    end_time,
                    assignee,
                }),
                None => {
                    tracing::warn!("skipping corrupt history record {id}: bad end_time '{end_time}'");
                }
            }
        }
        Ok(records)
    }

    async fn put(&self, record: HistoryRecord) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RotaBotError::StoreInternal(e.to_string()))?;
        conn.execute(
            "INSERT INTO history (id, rota_id, end_time, assignee) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                record.id,
                record.rota_id,
                record.end_time.to_rfc3339(),
                record.assignee,
            ],
        )
        .map_err(map_err)?;
        Ok(())
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Map rusqlite faults onto the store error taxonomy.
fn map_err(e: rusqlite::Error) -> RotaBotError {
    match &e {
        rusqlite::Error::SqliteFailure(code, _) => match code.code {
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                RotaBotError::StoreThrottled(e.to_string())
            }
            rusqlite::ErrorCode::CannotOpen | rusqlite::ErrorCode::NotADatabase => {
                RotaBotError::StoreUnavailable(e.to_string())
            }
            _ => RotaBotError::StoreInternal(e.to_string()),
        },
        _ => RotaBotError::StoreInternal(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_put_then_scan_round_trip() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        let record = HistoryRecord::new("RC", "sc", Utc::now() + Duration::hours(1));

        store.put(record.clone()).await.unwrap();
        let scanned = store.scan_all().await.unwrap();

        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].id, record.id);
        assert_eq!(scanned[0].rota_id, "RC");
        assert_eq!(scanned[0].assignee, "sc");
        // rfc3339 keeps sub-second precision
        assert_eq!(scanned[0].end_time, record.end_time);
    }

    #[tokio::test]
    async fn test_scan_empty_store() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        assert!(store.scan_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_accumulate_append_only() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        for i in 0..5i64 {
            let record =
                HistoryRecord::new("RC", "sc", Utc::now() + Duration::hours(i));
            store.put(record).await.unwrap();
        }
        assert_eq!(store.scan_all().await.unwrap().len(), 5);
        assert_eq!(store.record_count(), 5);
    }

    #[tokio::test]
    async fn test_corrupt_end_time_is_skipped() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO history (id, rota_id, end_time, assignee) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params!["bad-1", "RC", "not-a-timestamp", "sc"],
            )
            .unwrap();
        }
        store
            .put(HistoryRecord::new("RC", "jo", Utc::now()))
            .await
            .unwrap();

        let scanned = store.scan_all().await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].assignee, "jo");
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        let record = HistoryRecord::new("RC", "sc", Utc::now());
        store.put(record.clone()).await.unwrap();
        let err = store.put(record).await.unwrap_err();
        assert!(err.is_store_fault());
    }
}
