//! Output format value object

use serde::{Deserialize, Serialize};

/// How a reasoning result is rendered on the console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Thinking, search request and answer sections (default)
    #[default]
    Full,
    /// Only the answer, or the search request when no answer was given
    Answer,
    /// The complete result object as JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(OutputFormat::Full),
            "answer" => Ok(OutputFormat::Answer),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format '{}' (expected full, answer or json)",
                other
            )),
        }
    }
}
