//! Structured-output section extraction.
//!
//! The reasoning model answers inside three delimiter pairs:
//!
//! | Section  | Delimiters              | Meaning                          |
//! |----------|-------------------------|----------------------------------|
//! | thinking | `<think>` `</think>`    | step-by-step reasoning           |
//! | search   | `<search>` `</search>`  | request for more information     |
//! | answer   | `<answer>` `</answer>`  | final assessment                 |
//!
//! Extraction is a pure function over immutable text. A section is present
//! only when both its opening and closing delimiter are found; a partial
//! delimiter is reported through [`TagDiagnostics`] and never treated as a match.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>\s*(.*?)\s*</think>").expect("valid regex"));
static SEARCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<search>\s*(.*?)\s*</search>").expect("valid regex"));
static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<answer>\s*(.*?)\s*</answer>").expect("valid regex"));

/// Section delimiters the model is instructed to use.
pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";
pub const SEARCH_OPEN: &str = "<search>";
pub const SEARCH_CLOSE: &str = "</search>";
pub const ANSWER_OPEN: &str = "<answer>";
pub const ANSWER_CLOSE: &str = "</answer>";

/// Closing delimiters at which generation may stop.
pub const STOP_SEQUENCES: [&str; 2] = [SEARCH_CLOSE, ANSWER_CLOSE];

/// Sections derived from raw model output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSections {
    pub thinking: Option<String>,
    pub search_query: Option<String>,
    pub answer: Option<String>,
}

impl ExtractedSections {
    /// True when none of the three sections was found.
    pub fn is_empty(&self) -> bool {
        self.thinking.is_none() && self.search_query.is_none() && self.answer.is_none()
    }

    pub fn requests_search(&self) -> bool {
        self.search_query.is_some()
    }
}

/// Presence of each individual delimiter in a text.
///
/// Used to explain why extraction found nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagDiagnostics {
    pub think: (bool, bool),
    pub search: (bool, bool),
    pub answer: (bool, bool),
}

impl TagDiagnostics {
    pub fn scan(text: &str) -> Self {
        Self {
            think: (text.contains(THINK_OPEN), text.contains(THINK_CLOSE)),
            search: (text.contains(SEARCH_OPEN), text.contains(SEARCH_CLOSE)),
            answer: (text.contains(ANSWER_OPEN), text.contains(ANSWER_CLOSE)),
        }
    }

    /// True when at least one delimiter appears anywhere in the text.
    pub fn any(&self) -> bool {
        let pairs = [self.think, self.search, self.answer];
        pairs.iter().any(|(open, close)| *open || *close)
    }

    /// True when some delimiter pair is missing one side.
    pub fn has_partial(&self) -> bool {
        let pairs = [self.think, self.search, self.answer];
        pairs.iter().any(|(open, close)| open != close)
    }
}

impl std::fmt::Display for TagDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "think[{},{}], search[{},{}], answer[{},{}]",
            self.think.0, self.think.1, self.search.0, self.search.1, self.answer.0, self.answer.1
        )
    }
}

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Locate the first well-formed occurrence of each section in `text`.
///
/// Idempotent and side-effect free: the same text always yields the same
/// sections.
pub fn extract_sections(text: &str) -> ExtractedSections {
    ExtractedSections {
        thinking: first_match(&THINK_RE, text),
        search_query: first_match(&SEARCH_RE, text),
        answer: first_match(&ANSWER_RE, text),
    }
}
