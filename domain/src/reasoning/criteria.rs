//! Clinical criteria rubrics.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Key of the rubric used when no other is active.
pub const DEFAULT_CRITERIA_KEY: &str = "qSOFA";

/// A named clinical scoring rubric injected into the system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "criteria")]
    pub criteria_lines: Vec<String>,
    /// Threshold rule; empty means none.
    #[serde(default)]
    pub threshold: String,
}

impl CriteriaConfig {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        criteria_lines: Vec<String>,
        threshold: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            criteria_lines,
            threshold: threshold.into(),
        }
    }

    pub fn has_threshold(&self) -> bool {
        !self.threshold.trim().is_empty()
    }

    /// Reject rubrics that cannot produce a meaningful prompt.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidCriteria("name is empty".to_string()));
        }
        if self.criteria_lines.iter().all(|l| l.trim().is_empty()) {
            return Err(DomainError::InvalidCriteria(format!(
                "'{}' has no criteria lines",
                self.name
            )));
        }
        Ok(())
    }
}

/// Listing entry for a registered rubric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaSummary {
    pub key: String,
    pub name: String,
    pub description: String,
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Quick Sequential Organ Failure Assessment.
pub fn qsofa() -> CriteriaConfig {
    CriteriaConfig::new(
        "qSOFA",
        "Quick Sequential Organ Failure Assessment",
        lines(&[
            "- Respiratory Rate (RR) ≥ 22 breaths/min",
            "- Systolic Blood Pressure (SBP) ≤ 100 mmHg",
            "- Altered mentation (GCS verbal response is not \"Oriented\")",
        ]),
        "≥2 => qSOFA",
    )
}

/// Systemic Inflammatory Response Syndrome.
pub fn sirs() -> CriteriaConfig {
    CriteriaConfig::new(
        "SIRS",
        "Systemic Inflammatory Response Syndrome",
        lines(&[
            "- Temperature >38°C or <36°C",
            "- Heart rate >90/min",
            "- Respiratory rate >20/min or PaCO2 <32 mmHg",
            "- White blood cell count >12,000/mm³ or <4,000/mm³ or >10% immature bands",
        ]),
        "≥2 => SIRS",
    )
}

pub fn sepsis3() -> CriteriaConfig {
    CriteriaConfig::new(
        "Sepsis-3",
        "Sepsis-3 Definition",
        lines(&[
            "- Suspected or documented infection",
            "- Acute increase in SOFA score ≥2 points",
            "- qSOFA ≥2 (in patients outside the ICU)",
        ]),
        "All criteria met => Sepsis-3",
    )
}

/// Built-in rubrics keyed by registry key, in listing order.
pub fn builtin_criteria() -> Vec<(String, CriteriaConfig)> {
    vec![
        ("qSOFA".to_string(), qsofa()),
        ("SIRS".to_string(), sirs()),
        ("Sepsis-3".to_string(), sepsis3()),
    ]
}

pub fn is_builtin_key(key: &str) -> bool {
    matches!(key, "qSOFA" | "SIRS" | "Sepsis-3")
}
