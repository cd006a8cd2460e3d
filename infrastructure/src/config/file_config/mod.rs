//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod database;
mod engines;
mod models;
mod reasoning;
mod server;

pub use database::FileDatabaseConfig;
pub use engines::{FileEngineConfig, FileEngineProcessConfig, FileEnginesConfig};
pub use models::{DEFAULT_REASONING_MODEL, DEFAULT_SQL_MODEL, FileModelsConfig};
pub use reasoning::FileReasoningConfig;
pub use server::{FileCriteriaConfig, FileLoggingConfig, FileServerConfig};

use medreason_application::ReasoningParams;
use medreason_domain::{BackendKind, ConfigIssue};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Reasoning and SQL model selection
    pub models: FileModelsConfig,
    /// Backend override and load control
    pub engine: FileEngineConfig,
    /// Engine commands and endpoints
    pub engines: FileEnginesConfig,
    /// Clinical database
    pub database: FileDatabaseConfig,
    /// Generation limits
    pub reasoning: FileReasoningConfig,
    /// HTTP transport
    pub server: FileServerConfig,
    /// Conversation log
    pub logging: FileLoggingConfig,
    /// Active rubric
    pub criteria: FileCriteriaConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Empty model names
    /// 2. Unsupported backend override
    /// 3. Database row cap and file presence
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.models.validate());
        issues.extend(self.engine.parse_force_backend().1);
        issues.extend(self.database.validate());
        issues
    }

    pub fn force_backend(&self) -> Option<BackendKind> {
        self.engine.parse_force_backend().0
    }

    /// Parameters for the reasoning use cases.
    pub fn reasoning_params(&self) -> ReasoningParams {
        ReasoningParams::default()
            .with_max_tokens(self.reasoning.max_tokens)
            .with_temperature(self.reasoning.temperature)
            .with_sql_generation(self.reasoning.sql_max_tokens, self.reasoning.sql_temperature)
            .with_row_cap(self.database.row_cap)
            .with_progress_poll_timeout(self.server.progress_poll_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[models]
reasoning = "local/reasoner"
reasoning_port = 9001

[engine]
force_backend = "cpu"

[engines.fallback]
command = "/opt/llama/llama-server"
args = ["-m", "{model}", "--port", "{port}"]
managed = false

[database]
path = "/data/mimic.db"
row_cap = 5

[reasoning]
max_tokens = 2048

[server]
addr = "0.0.0.0:8080"

[criteria]
active = "SIRS"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.models.reasoning, "local/reasoner");
        assert_eq!(config.models.reasoning_port, 9001);
        assert_eq!(config.models.sql, DEFAULT_SQL_MODEL);
        assert_eq!(config.force_backend(), Some(BackendKind::Cpu));
        assert!(!config.engines.fallback.managed);
        assert_eq!(config.engines.fallback.host, "127.0.0.1");
        assert_eq!(config.engines.high_throughput.command, "vllm");
        assert_eq!(config.database.row_cap, 5);
        assert_eq!(config.server.addr, "0.0.0.0:8080");
        assert_eq!(config.criteria.active, "SIRS");

        let params = config.reasoning_params();
        assert_eq!(params.max_tokens, 2048);
        assert_eq!(params.sql_max_tokens, 200);
        assert_eq!(params.row_cap, 5);
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.models.reasoning, DEFAULT_REASONING_MODEL);
        assert!(config.engines.high_throughput.managed);
        assert!(config.database.path.is_none());
        assert_eq!(config.criteria.active, "qSOFA");
        assert_eq!(
            config.reasoning_params().progress_poll_timeout,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_collects_issues() {
        let mut config = FileConfig::default();
        config.models.reasoning = String::new();
        config.engine.force_backend = Some("quantum".into());
        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert_eq!(config.force_backend(), None);
    }
}
