//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error(
        "No patient ID found in prompt. Please specify a patient ID (e.g., 'patient 12345' or 'admission=12345')."
    )]
    MissingPatientId,

    #[error("Input cannot be empty")]
    EmptyInput,

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),
}

impl DomainError {
    /// Check if this error should be surfaced verbatim to the caller
    /// as a client-side (4xx-equivalent) failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::MissingPatientId | DomainError::EmptyInput
        )
    }
}
