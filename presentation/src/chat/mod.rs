//! Interactive chat module
//!
//! Provides a readline-based interactive reasoning session.

mod repl;

pub use repl::ChatRepl;
