//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod context_retriever;
pub mod conversation_logger;
pub mod criteria_registry;
pub mod model_handler;
pub mod progress;
