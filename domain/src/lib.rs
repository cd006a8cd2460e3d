//! Domain layer for medreason
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Reasoning
//!
//! A clinician question about a patient is answered by a model that writes
//! structured output:
//!
//! - **`<think>`**: step-by-step reasoning
//! - **`<search>`**: a request for more information (the turn ends in `NeedsInfo`)
//! - **`<answer>`**: the final assessment (the turn ends in `Answered`)
//!
//! The model is steered by a [`CriteriaConfig`] rubric such as qSOFA.
//!
//! ## Backends
//!
//! Two interchangeable handler variants exist. [`select_backend`] maps a
//! [`HostProbe`] to a [`SystemProfile`] without touching hardware.

pub mod config;
pub mod core;
pub mod inference;
pub mod progress;
pub mod prompt;
pub mod reasoning;
pub mod retrieval;
pub mod session;

// Re-export commonly used types
pub use config::{
    OutputFormat,
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use core::error::DomainError;
pub use inference::{
    backend::{
        AcceleratorKind, BackendKind, Eligibility, HandlerVariant, HostProbe, SystemProfile,
        fallback_eligibility, high_throughput_eligibility, select_backend,
    },
    generation::{GenerationOptions, ModelResponse, ModelRole},
};
pub use progress::{
    log_scan::{LogProgress, scan_progress_line},
    snapshot::{ProgressRecord, ProgressSnapshot, ProgressState},
};
pub use prompt::PromptTemplate;
pub use reasoning::{
    criteria::{CriteriaConfig, CriteriaSummary, DEFAULT_CRITERIA_KEY},
    outcome::{ReasoningState, SqlStatus},
    patient::{UNKNOWN_PATIENT, extract_patient_id, patient_id_from_transcript},
    sections::{ExtractedSections, STOP_SEQUENCES, TagDiagnostics, extract_sections},
};
pub use retrieval::sql::{SqlRetrievalResult, SqlRow, SqlValue, sanitize_statement};
pub use session::entities::{ConversationTurn, RawTurn, Role, Transcript};
