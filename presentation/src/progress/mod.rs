//! Model loading progress display.

pub mod reporter;
