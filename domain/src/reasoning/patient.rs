//! Patient identifier extraction.

use crate::core::error::DomainError;
use crate::session::entities::Transcript;
use regex::Regex;
use std::sync::LazyLock;

static PATIENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)patient\s+(\d+)").expect("valid regex"));
static ADMISSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)admission=(\d+)").expect("valid regex"));

/// Identifier used when a continuation carries no recognizable patient id.
pub const UNKNOWN_PATIENT: &str = "unknown";

/// Extract the patient identifier from free text.
///
/// `patient <digits>` takes precedence over `admission=<digits>`.
pub fn extract_patient_id(text: &str) -> Result<String, DomainError> {
    PATIENT_RE
        .captures(text)
        .or_else(|| ADMISSION_RE.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(DomainError::MissingPatientId)
}

/// Recover the patient identifier from a prior transcript.
///
/// Scans the first user turn, then every turn in order. Falls back to
/// [`UNKNOWN_PATIENT`] instead of failing.
pub fn patient_id_from_transcript(transcript: &Transcript) -> String {
    let first_user = transcript
        .first_user()
        .and_then(|turn| extract_patient_id(&turn.content).ok());

    first_user
        .or_else(|| {
            transcript
                .turns()
                .iter()
                .find_map(|turn| extract_patient_id(&turn.content).ok())
        })
        .unwrap_or_else(|| UNKNOWN_PATIENT.to_string())
}
