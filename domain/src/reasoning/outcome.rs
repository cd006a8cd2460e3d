//! Reasoning turn outcome value objects.

use super::sections::ExtractedSections;
use serde::{Deserialize, Serialize};

/// Position of a reasoning session in its lifecycle.
///
/// `NeedsInfo` and `Answered` both hand control back to the caller; a
/// `NeedsInfo` session re-enters `AwaitingModel` on the next call with the
/// same transcript plus new user content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningState {
    New,
    AwaitingModel,
    NeedsInfo,
    Answered,
}

impl ReasoningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReasoningState::NeedsInfo | ReasoningState::Answered)
    }

    /// Terminal state for one model response.
    ///
    /// A search request means the model awaits more information, unless a
    /// database excerpt was already applied to this turn.
    pub fn decide(sections: &ExtractedSections, sql: SqlStatus) -> Self {
        if sections.requests_search() && sql != SqlStatus::Applied {
            ReasoningState::NeedsInfo
        } else {
            ReasoningState::Answered
        }
    }
}

impl std::fmt::Display for ReasoningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReasoningState::New => "new",
            ReasoningState::AwaitingModel => "awaiting_model",
            ReasoningState::NeedsInfo => "needs_info",
            ReasoningState::Answered => "answered",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of database augmentation for one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlStatus {
    #[default]
    NotRequested,
    Applied,
    Failed,
}

impl SqlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlStatus::NotRequested => "not_requested",
            SqlStatus::Applied => "applied",
            SqlStatus::Failed => "failed",
        }
    }
}
