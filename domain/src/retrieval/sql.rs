//! SQL retrieval value objects and statement handling.

use serde::{Deserialize, Serialize};

/// Rows folded back into reasoning context.
pub const DEFAULT_ROW_CAP: usize = 10;

/// Placeholder excerpt for a query that returned nothing.
pub const NO_RESULTS: &str = "No results found";

/// Reduce model output to a single terminated statement.
///
/// Markdown fences are dropped, the text is split on `;` and only the first
/// non-empty statement is kept. Returns `None` when nothing remains.
pub fn sanitize_statement(raw: &str) -> Option<String> {
    let unfenced: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let first = unfenced
        .split(';')
        .map(str::trim)
        .find(|stmt| !stmt.is_empty())?;

    Some(format!("{};", first))
}

/// A single SQLite cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => write!(f, "'{}'", s),
            SqlValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

pub type SqlRow = Vec<SqlValue>;

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlRetrievalResult {
    pub query: String,
    pub columns: Vec<String>,
    /// Rows kept for the excerpt, at most the row cap.
    pub rows: Vec<SqlRow>,
    pub truncated: bool,
    /// Total rows returned by the engine.
    pub total_rows: usize,
}

impl SqlRetrievalResult {
    /// Build from every fetched row, keeping at most `cap`.
    pub fn from_rows(
        query: impl Into<String>,
        columns: Vec<String>,
        mut rows: Vec<SqlRow>,
        cap: usize,
    ) -> Self {
        let total_rows = rows.len();
        let truncated = total_rows > cap;
        rows.truncate(cap);
        Self {
            query: query.into(),
            columns,
            rows,
            truncated,
            total_rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Text spliced into the reasoning prompt.
    pub fn excerpt(&self) -> String {
        if self.is_empty() {
            return NO_RESULTS.to_string();
        }

        let mut out = String::new();
        if !self.columns.is_empty() {
            out.push_str(&format!("Columns: {}\n", self.columns.join(", ")));
        }
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            out.push_str(&format!("({})\n", cells.join(", ")));
        }
        if self.truncated {
            out.push_str(&format!("(+{} more rows)\n", self.total_rows - self.rows.len()));
        }
        out.trim_end().to_string()
    }
}
