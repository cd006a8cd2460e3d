//! Prompt domain
//!
//! Templates for the reasoning and SQL-generation stages, and ChatML
//! formatting for single-string prompt engines.

pub mod chat_format;
mod template;

pub use template::PromptTemplate;
