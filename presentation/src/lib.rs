//! Presentation layer for medreason
//!
//! This crate contains CLI definitions, the HTTP transport, output
//! formatters, progress reporters, and the interactive chat interface.

pub mod chat;
pub mod cli;
pub mod http;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use chat::ChatRepl;
pub use cli::commands::{Cli, Command};
pub use http::{AppState, serve};
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
