//! SQLite-backed task status store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};

use super::{StoreError, TaskFilter, TaskRecord, TaskStatus, TaskStatusStore};

const SELECT_COLUMNS: &str =
    "id, acquired_path, transcoded_path, published, done, created_at, updated_at";

/// SQLite-backed task status store.
///
/// Each write is a single autocommit statement, so a crash leaves either the
/// previous row or the new one. The connection mutex is held for one
/// statement at a time.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Create a new SQLite task store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite task store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;

            CREATE TABLE IF NOT EXISTS task_status (
                id TEXT PRIMARY KEY,
                acquired_path TEXT,
                transcoded_path TEXT,
                published INTEGER NOT NULL DEFAULT 0,
                done INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_task_status_done ON task_status(done);
            CREATE INDEX IF NOT EXISTS idx_task_status_updated_at ON task_status(updated_at);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TaskRecord> {
        let id: String = row.get(0)?;
        let acquired_path: Option<String> = row.get(1)?;
        let transcoded_path: Option<String> = row.get(2)?;
        let published: bool = row.get(3)?;
        let done: bool = row.get(4)?;
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        // Timestamps are always written by this store as RFC 3339
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(TaskRecord {
            id,
            status: TaskStatus {
                acquired_path,
                transcoded_path,
                published,
                done,
            },
            created_at,
            updated_at,
        })
    }

    fn query_record(conn: &Connection, id: &str) -> Result<TaskRecord, StoreError> {
        let sql = format!("SELECT {} FROM task_status WHERE id = ?", SELECT_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_record) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn build_where_clause(filter: &TaskFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let where_clause = match filter.done {
            Some(done) => {
                params.push(Box::new(done));
                "WHERE done = ?".to_string()
            }
            None => String::new(),
        };

        (where_clause, params)
    }
}

impl TaskStatusStore for SqliteTaskStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM task_status WHERE id = ?)",
            params![id],
            |row| row.get::<_, bool>(0),
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn create(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now();

        let result = conn.execute(
            "INSERT INTO task_status (id, acquired_path, transcoded_path, published, done, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                status.acquired_path,
                status.transcoded_path,
                status.published,
                status.done,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(TaskRecord {
                id: id.to_string(),
                status,
                created_at: now,
                updated_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::AlreadyExists(id.to_string()))
            }
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn get(&self, id: &str) -> Result<TaskRecord, StoreError> {
        let conn = self.lock()?;
        Self::query_record(&conn, id)
    }

    fn update(&self, id: &str, status: TaskStatus) -> Result<TaskRecord, StoreError> {
        let conn = self.lock()?;
        let now = Utc::now();

        let changed = conn
            .execute(
                "UPDATE task_status SET acquired_path = ?, transcoded_path = ?, published = ?, done = ?, updated_at = ? WHERE id = ?",
                params![
                    status.acquired_path,
                    status.transcoded_path,
                    status.published,
                    status.done,
                    now.to_rfc3339(),
                    id,
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        Self::query_record(&conn, id)
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM task_status {} ORDER BY updated_at DESC, id ASC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_record)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let record = row_result.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(record);
        }

        Ok(records)
    }

    fn count(&self, filter: &TaskFilter) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM task_status {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
