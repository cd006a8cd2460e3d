//! Context retrieval ports
//!
//! [`ContextRetriever`] is what the reasoning use case consumes;
//! [`SqlExecutor`] is the database adapter behind the SQL implementation.

use async_trait::async_trait;
use medreason_domain::{SqlRetrievalResult, SqlRow};
use thiserror::Error;

/// Errors from database-backed context retrieval
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("SQL generation failed: {0}")]
    Generation(String),

    #[error("Model produced no SQL statement")]
    EmptyStatement,

    #[error("SQL execution failed for `{query}`: {message}")]
    Execution { query: String, message: String },

    #[error("Database error: {0}")]
    Database(String),
}

/// Retrieves patient data to augment a reasoning turn.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(
        &self,
        patient_id: &str,
        question: &str,
    ) -> Result<SqlRetrievalResult, RetrievalError>;
}

/// Rows returned by a single statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<SqlRow>,
}

/// Errors raised by a [`SqlExecutor`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlExecutorError {
    /// The engine rejected the statement (syntax, unknown table, ...).
    #[error("SQLite error: {0}")]
    Operational(String),

    #[error("Query execution error: {0}")]
    Other(String),
}

/// Executes one read-only statement against the clinical database.
///
/// Each call uses its own connection.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, statement: &str) -> Result<QueryRows, SqlExecutorError>;
}
