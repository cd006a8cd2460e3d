//! Console output formatter for reasoning results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use medreason_application::ReasoningResult;
use medreason_domain::{Eligibility, OutputFormat, SqlStatus, SystemProfile};

/// Formats reasoning results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Render according to the selected format.
    pub fn render(result: &ReasoningResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format(result),
            OutputFormat::Answer => Self::format_answer_only(result),
            OutputFormat::Json => Self::format_json(result),
        }
    }

    /// Format every section of the result
    pub fn format(result: &ReasoningResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!("Patient {}", result.patient_id)));
        output.push('\n');

        output.push_str(&format!(
            "{} {}   {} {}\n",
            "Backend:".cyan().bold(),
            result.backend,
            "State:".cyan().bold(),
            result.state
        ));

        if result.use_sql {
            output.push_str(&Self::sql_line(result));
        }

        if let Some(thinking) = &result.thinking {
            output.push_str(&Self::section_header("Thinking"));
            output.push_str(&format!("{}\n", thinking.dimmed()));
        }

        if let Some(search) = &result.search_query {
            output.push_str(&Self::section_header("Needs information"));
            output.push_str(&format!("{}\n", search.yellow()));
        }

        if let Some(answer) = &result.answer {
            output.push_str(&Self::section_header("Answer"));
            output.push_str(&format!("{}\n", answer.green().bold()));
        }

        if result.malformed_output {
            output.push_str(&Self::section_header("Raw output (no sections found)"));
            output.push_str(&format!("{}\n", result.full_response));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(result: &ReasoningResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Answer, or the search request when the model needs more information
    pub fn format_answer_only(result: &ReasoningResult) -> String {
        if let Some(answer) = &result.answer {
            return answer.clone();
        }
        if let Some(search) = &result.search_query {
            return format!("{} {}", "Needs information:".yellow().bold(), search);
        }
        result.full_response.trim().to_string()
    }

    /// Detection summary for `medreason detect`
    pub fn format_profile(
        profile: &SystemProfile,
        high_throughput: &Eligibility,
        fallback: &Eligibility,
    ) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Backend detection"));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n",
            "Accelerator:".cyan().bold(),
            profile.accelerator
        ));
        let forced = if profile.forced { " (forced)" } else { "" };
        output.push_str(&format!(
            "{} {}{}\n\n",
            "Recommended:".cyan().bold(),
            profile.recommended,
            forced
        ));
        output.push_str(&Self::eligibility_line("high_throughput", high_throughput));
        output.push_str(&Self::eligibility_line("fallback", fallback));
        output.push_str(&Self::footer());
        output
    }

    fn eligibility_line(name: &str, eligibility: &Eligibility) -> String {
        let mark = if eligibility.usable {
            "v".green()
        } else {
            "x".red()
        };
        format!("  {} {:<16} {}\n", mark, name, eligibility.reason)
    }

    fn sql_line(result: &ReasoningResult) -> String {
        match result.sql_status {
            SqlStatus::Applied => format!(
                "{} {}\n",
                "SQL:".cyan().bold(),
                result.sql_query.as_deref().unwrap_or("")
            ),
            SqlStatus::Failed => format!(
                "{} {}\n",
                "SQL failed:".red().bold(),
                result.sql_error.as_deref().unwrap_or("unknown error")
            ),
            SqlStatus::NotRequested => String::new(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, result: &ReasoningResult) -> String {
        Self::format(result)
    }

    fn format_json(&self, result: &ReasoningResult) -> String {
        Self::format_json(result)
    }

    fn format_answer_only(&self, result: &ReasoningResult) -> String {
        Self::format_answer_only(result)
    }
}
