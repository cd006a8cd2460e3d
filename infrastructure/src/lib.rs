//! Infrastructure layer for medreason
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: inference engines, host probing, the clinical
//! database, criteria storage, the conversation log and configuration
//! file loading.

pub mod config;
pub mod criteria;
pub mod database;
pub mod engines;
pub mod hardware;
pub mod logging;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use criteria::InMemoryCriteriaRegistry;
pub use database::{DatabaseError, SqliteExecutor};
pub use engines::{EngineError, EngineHandlerFactory};
pub use hardware::CapabilityDetector;
pub use logging::JsonlConversationLogger;
