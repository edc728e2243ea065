/*!
 * SQLite Registry
 *
 * Production registry backend. One connection is opened at startup and
 * shared behind a mutex that is held only for the duration of a single
 * operation. All statements are parameterised; query text lives here and
 * nowhere else.
 */

use super::traits::RegistryClient;
use super::types::{ProcessRecord, ProcessStatus};
use crate::core::errors::{ConnectionError, StoreError, StoreResult};
use crate::core::types::{Pid, RecordId, Timestamp};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS processes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pid INTEGER NOT NULL,
        status INTEGER NOT NULL DEFAULT 0,
        start_time INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_processes_status_start
        ON processes (status, start_time);
";

const NOW_SQL: &str = "SELECT CAST(strftime('%s', 'now') AS INTEGER)";
const INSERT_RUNNING_SQL: &str =
    "INSERT INTO processes (pid, status, start_time) VALUES (?1, ?2, ?3)";
const FIND_STALE_SQL: &str = "SELECT id, pid, status, start_time FROM processes
     WHERE status = ?1 AND start_time < ?2
     ORDER BY start_time, id";
const MARK_RECLAIMED_SQL: &str = "UPDATE processes SET status = ?1 WHERE pid = ?2 AND status = ?3";
const COUNT_RUNNING_SQL: &str = "SELECT COUNT(*) FROM processes WHERE status = ?1";
const ALL_RECORDS_SQL: &str = "SELECT id, pid, status, start_time FROM processes ORDER BY id";

/// How long a statement waits on a lock held by another registry user
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed process registry
#[derive(Clone)]
pub struct SqliteRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRegistry {
    /// Open (or create) the registry file and bootstrap the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| ConnectionError::OpenFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let registry = Self::from_connection(conn)?;
        info!(path = %path.display(), "Registry opened");
        Ok(registry)
    }

    /// Registry on a private in-memory SQLite database
    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        let conn = Connection::open_in_memory().map_err(|e| ConnectionError::OpenFailed {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ConnectionError> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| ConnectionError::SchemaFailed(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| ConnectionError::SchemaFailed(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(RecordId, i64, i64, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn decode(raw: (RecordId, i64, i64, i64)) -> StoreResult<ProcessRecord> {
        let (id, pid, status, start_time) = raw;
        let pid = Pid::try_from(pid)
            .map_err(|_| StoreError::Corrupt(format!("record {} has invalid pid {}", id, pid)))?;
        Ok(ProcessRecord {
            id,
            pid,
            status: ProcessStatus::from_code(status)?,
            start_time,
        })
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<ProcessRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        rows.into_iter().map(Self::decode).collect()
    }
}

impl RegistryClient for SqliteRegistry {
    fn now(&self) -> StoreResult<Timestamp> {
        let conn = self.conn.lock();
        let now = conn.query_row(NOW_SQL, [], |row| row.get::<_, i64>(0))?;
        Ok(now)
    }

    fn insert_running(&self, pid: Pid, start_time: Timestamp) -> StoreResult<RecordId> {
        let conn = self.conn.lock();
        conn.execute(
            INSERT_RUNNING_SQL,
            params![i64::from(pid), ProcessStatus::Running.code(), start_time],
        )?;
        let id = conn.last_insert_rowid();
        debug!(pid, start_time, record_id = id, "Inserted running record");
        Ok(id)
    }

    fn find_stale_running(&self, older_than: Timestamp) -> StoreResult<Vec<ProcessRecord>> {
        self.query_records(
            FIND_STALE_SQL,
            params![ProcessStatus::Running.code(), older_than],
        )
    }

    fn mark_reclaimed(&self, pid: Pid) -> StoreResult<u64> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            MARK_RECLAIMED_SQL,
            params![
                ProcessStatus::Reclaimed.code(),
                i64::from(pid),
                ProcessStatus::Running.code()
            ],
        )?;
        Ok(changed as u64)
    }

    fn count_running(&self) -> StoreResult<u64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            COUNT_RUNNING_SQL,
            params![ProcessStatus::Running.code()],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn records(&self) -> StoreResult<Vec<ProcessRecord>> {
        self.query_records(ALL_RECORDS_SQL, params![])
    }
}
