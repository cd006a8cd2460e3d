//! Clinical database access.

mod sqlite;

pub use sqlite::{DatabaseError, SqliteExecutor};
