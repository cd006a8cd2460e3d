//! SQLite adapter for the clinical database.
//!
//! Each statement runs on a blocking thread over its own read-only
//! connection, so concurrent retrievals share no connection state.

use async_trait::async_trait;
use medreason_application::{QueryRows, SqlExecutor, SqlExecutorError};
use medreason_domain::{SqlRow, SqlValue};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

/// Errors raised while setting up the database adapter
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("No database path configured (set database.path or MEDREASON_DATABASE__PATH)")]
    NotConfigured,

    #[error("Database file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Cannot open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

/// Read-only executor over a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    path: PathBuf,
}

impl SqliteExecutor {
    /// Check that the file exists and can be opened.
    ///
    /// A missing database is a configuration error, reported here rather
    /// than on every query.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(DatabaseError::Missing(path));
        }
        open_read_only(&path).map_err(|source| DatabaseError::Open {
            path: path.clone(),
            source,
        })?;
        info!("Using clinical database {}", path.display());
        Ok(Self { path })
    }

    /// Resolve an optional configured path.
    pub fn from_config(path: Option<PathBuf>) -> Result<Self, DatabaseError> {
        match path {
            Some(path) => Self::open(path),
            None => Err(DatabaseError::NotConfigured),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

fn to_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(r) => SqlValue::Real(r),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}

fn classify(err: rusqlite::Error) -> SqlExecutorError {
    match err {
        rusqlite::Error::SqliteFailure(_, _) => SqlExecutorError::Operational(err.to_string()),
        other => SqlExecutorError::Other(other.to_string()),
    }
}

/// Open, run one statement, fetch every row, close.
fn run_statement(path: &Path, statement: &str) -> Result<QueryRows, SqlExecutorError> {
    let conn = open_read_only(path).map_err(classify)?;
    let mut stmt = conn.prepare(statement).map_err(classify)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows: Vec<SqlRow> = Vec::new();
    let mut cursor = stmt.query([]).map_err(classify)?;
    while let Some(row) = cursor.next().map_err(classify)? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(to_value(row.get_ref(idx).map_err(classify)?));
        }
        rows.push(values);
    }

    Ok(QueryRows { columns, rows })
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn execute(&self, statement: &str) -> Result<QueryRows, SqlExecutorError> {
        let path = self.path.clone();
        let statement = statement.to_string();
        debug!("Executing SQL: {}", statement);

        spawn_blocking(move || run_statement(&path, &statement))
            .await
            .map_err(|e| SqlExecutorError::Other(format!("query task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinical.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE prescriptions (subject_id INTEGER, hadm_id INTEGER, drug TEXT, dose_val_rx REAL);
             INSERT INTO prescriptions VALUES (10000032, 22595853, 'Furosemide', 40.0);
             INSERT INTO prescriptions VALUES (10000032, 22595853, 'Spironolactone', NULL);
             CREATE TABLE patients (subject_id INTEGER, gender TEXT, anchor_age INTEGER);
             INSERT INTO patients VALUES (10000032, 'F', 52);",
        )
        .unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteExecutor::open(dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, DatabaseError::Missing(_)));
        assert!(matches!(
            SqliteExecutor::from_config(None).unwrap_err(),
            DatabaseError::NotConfigured
        ));
    }

    #[tokio::test]
    async fn test_execute_returns_typed_rows() {
        let (_dir, path) = fixture();
        let executor = SqliteExecutor::open(&path).unwrap();
        let result = executor
            .execute("SELECT drug, dose_val_rx FROM prescriptions WHERE subject_id = 10000032 ORDER BY drug;")
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["drug", "dose_val_rx"]);
        assert_eq!(
            result.rows,
            vec![
                vec![SqlValue::Text("Furosemide".into()), SqlValue::Real(40.0)],
                vec![SqlValue::Text("Spironolactone".into()), SqlValue::Null],
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_sql_is_operational_error() {
        let (_dir, path) = fixture();
        let executor = SqliteExecutor::open(&path).unwrap();
        let err = executor
            .execute("SELECT * FROM no_such_table;")
            .await
            .unwrap_err();
        assert!(matches!(err, SqlExecutorError::Operational(_)));
    }

    #[tokio::test]
    async fn test_connection_is_read_only() {
        let (_dir, path) = fixture();
        let executor = SqliteExecutor::open(&path).unwrap();
        let err = executor.execute("DROP TABLE patients;").await.unwrap_err();
        assert!(matches!(err, SqlExecutorError::Operational(_)));

        let still_there = executor
            .execute("SELECT anchor_age FROM patients;")
            .await
            .unwrap();
        assert_eq!(still_there.rows, vec![vec![SqlValue::Integer(52)]]);
    }
}
