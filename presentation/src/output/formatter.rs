//! Output formatter trait

use medreason_application::ReasoningResult;

/// Trait for formatting reasoning results
pub trait OutputFormatter {
    /// Format every section of the result
    fn format(&self, result: &ReasoningResult) -> String;

    /// Format as JSON
    fn format_json(&self, result: &ReasoningResult) -> String;

    /// Format the answer only (concise output)
    fn format_answer_only(&self, result: &ReasoningResult) -> String;
}
