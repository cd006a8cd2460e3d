//! Database retrieval domain.

pub mod sql;
