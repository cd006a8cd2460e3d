//! Model selection from TOML (`[models]` section)

use medreason_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REASONING_MODEL: &str = "tossowski/MedAgentReasoner-3B-Chat";
pub const DEFAULT_SQL_MODEL: &str = "Qwen/Qwen2.5-Coder-7B";

/// Model selection from TOML
///
/// # Example
///
/// ```toml
/// [models]
/// reasoning = "tossowski/MedAgentReasoner-3B-Chat"  # criteria reasoning
/// reasoning_port = 8101
/// sql = "Qwen/Qwen2.5-Coder-7B"                     # natural language to SQL
/// sql_port = 8102
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    pub reasoning: String,
    /// Port the reasoning engine listens on.
    pub reasoning_port: u16,
    pub sql: String,
    /// Port the SQL engine listens on.
    pub sql_port: u16,
}

impl Default for FileModelsConfig {
    fn default() -> Self {
        Self {
            reasoning: DEFAULT_REASONING_MODEL.to_string(),
            reasoning_port: 8101,
            sql: DEFAULT_SQL_MODEL.to_string(),
            sql_port: 8102,
        }
    }
}

impl FileModelsConfig {
    /// Port configured for a model identifier, if it is one of ours.
    pub fn port_for(&self, model: &str) -> Option<u16> {
        if model == self.reasoning {
            Some(self.reasoning_port)
        } else if model == self.sql {
            Some(self.sql_port)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (field, value) in [("reasoning", &self.reasoning), ("sql", &self.sql)] {
            if value.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyModelName {
                        field: field.to_string(),
                    },
                    format!("models.{}: model name cannot be empty", field),
                ));
            }
        }
        issues
    }
}
