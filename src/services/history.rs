use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::classify_types::{BinInfo, Category};
use crate::models::history_types::{HistoryRecord, Statistics};

/// Append-only record log with derived statistics, backed by sqlite.
///
/// The store is the sole writer of persisted state. `append` and
/// `clear_all` each run as a single statement on one connection, so
/// `statistics()` readers never observe a partially written record set.
#[derive(Clone)]
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    /// Open (or create) the store at `path`.
    ///
    /// Fail-open: an unreadable or corrupted database file is moved aside
    /// and replaced with an empty log rather than surfacing a fatal error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        match Self::try_open(path) {
            Ok(store) => Ok(store),
            Err(e) => {
                log::warn!(
                    "history db {} is unreadable ({}); starting with an empty log",
                    path.display(),
                    e
                );
                quarantine_db(path);
                Self::try_open(path)
            }
        }
    }

    /// In-memory store for tests and ephemeral sessions.
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn try_open(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), AppError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                bin_name TEXT NOT NULL,
                bin_advice TEXT NOT NULL,
                bin_color TEXT NOT NULL,
                category TEXT NOT NULL,
                confidence REAL NOT NULL,
                timestamp INTEGER NOT NULL,
                image_locator TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp)",
            [],
        )?;
        Ok(())
    }

    /// Durably persist one record, assigning a unique id and a timestamp
    /// if the caller left them unset. An id that already exists is never
    /// overwritten.
    pub fn append(&self, record: HistoryRecord) -> Result<HistoryRecord, AppError> {
        let id = record
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let timestamp = record.timestamp.unwrap_or_else(Utc::now);

        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO history
                (id, label, bin_name, bin_advice, bin_color, category, confidence, timestamp, image_locator)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                record.label,
                record.bin.name,
                record.bin.advice,
                record.bin.color_hex,
                record.category.as_str(),
                record.confidence as f64,
                timestamp.timestamp_millis(),
                record.image_locator,
            ],
        )?;
        if inserted == 0 {
            log::debug!("append ignored: record {} already exists", id);
        }

        Ok(HistoryRecord {
            id: Some(id),
            timestamp: Some(timestamp),
            ..record
        })
    }

    /// Newest-first snapshot of the record log; insertion order breaks
    /// timestamp ties (later insertion = newer). Not a live view.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<HistoryRecord>, AppError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, label, bin_name, bin_advice, bin_color, category, confidence, timestamp, image_locator
             FROM history
             ORDER BY timestamp DESC, rowid DESC
             LIMIT ?1",
        )?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = stmt.query_map(params![limit], |row| {
            let millis: i64 = row.get(7)?;
            Ok(HistoryRecord {
                id: Some(row.get(0)?),
                label: row.get(1)?,
                bin: BinInfo {
                    name: row.get(2)?,
                    advice: row.get(3)?,
                    color_hex: row.get(4)?,
                },
                category: Category::parse_lenient(&row.get::<_, String>(5)?),
                confidence: row.get::<_, f64>(6)? as f32,
                timestamp: Utc.timestamp_millis_opt(millis).single(),
                image_locator: row.get(8)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Atomically empty the record log. Irreversible; statistics reflect
    /// zero records immediately after return.
    pub fn clear_all(&self) -> Result<(), AppError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM history", [])?;
        Ok(())
    }

    /// Recompute aggregates from the full record log.
    pub fn statistics(&self) -> Result<Statistics, AppError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT category FROM history")?;
        let categories = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Statistics::recompute(
            categories.iter().map(|c| Category::parse_lenient(c)),
        ))
    }

    pub fn count(&self) -> Result<u64, AppError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn quarantine_db(path: &Path) {
    let mut corrupt: PathBuf = path.to_path_buf();
    corrupt.set_extension("corrupt");
    if let Err(e) = std::fs::rename(path, &corrupt) {
        log::warn!("could not move corrupt db aside: {}", e);
        let _ = std::fs::remove_file(path);
    }
    // WAL sidecars from the broken db must not be replayed into the new one.
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(sidecar));
    }
}
