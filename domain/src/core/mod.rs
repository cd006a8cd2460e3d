//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`string`]: log-friendly string helpers

pub mod error;
pub mod string;
