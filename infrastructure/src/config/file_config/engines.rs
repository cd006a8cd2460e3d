//! Inference engine configuration (`[engine]` and `[engines.*]` sections)

use medreason_domain::{BackendKind, ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine selection and load control
///
/// # Example
///
/// ```toml
/// [engine]
/// force_backend = "vllm"       # or MEDREASON_FORCE_BACKEND
/// load_timeout_secs = 900
/// health_interval_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    pub force_backend: Option<String>,
    pub load_timeout_secs: u64,
    pub health_interval_ms: u64,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            force_backend: None,
            load_timeout_secs: 900,
            health_interval_ms: 1000,
        }
    }
}

impl FileEngineConfig {
    /// Parsed override; unsupported values are dropped.
    pub fn parse_force_backend(&self) -> (Option<BackendKind>, Vec<ConfigIssue>) {
        let Some(raw) = self.force_backend.as_deref().filter(|s| !s.trim().is_empty()) else {
            return (None, Vec::new());
        };
        match BackendKind::parse_override(raw) {
            Some(kind) => (Some(kind), Vec::new()),
            None => (
                None,
                vec![ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "engine.force_backend".to_string(),
                        value: raw.to_string(),
                        valid_values: vec![
                            "high_throughput".to_string(),
                            "vllm".to_string(),
                            "fallback".to_string(),
                            "transformers".to_string(),
                            "llama".to_string(),
                            "cpu".to_string(),
                        ],
                    },
                    format!(
                        "engine.force_backend: unsupported backend '{}', using detection",
                        raw
                    ),
                )],
            ),
        }
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms.max(10))
    }
}

/// How to reach (and optionally launch) one inference engine
///
/// `args` may contain `{model}` and `{port}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineProcessConfig {
    pub command: String,
    pub args: Vec<String>,
    pub host: String,
    /// Launch the engine as a child process.
    pub managed: bool,
}

impl FileEngineProcessConfig {
    fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            host: "127.0.0.1".to_string(),
            managed: true,
        }
    }

    /// Arguments with placeholders substituted.
    pub fn render_args(&self, model: &str, port: u16) -> Vec<String> {
        let port = port.to_string();
        self.args
            .iter()
            .map(|a| a.replace("{model}", model).replace("{port}", &port))
            .collect()
    }

    pub fn base_url(&self, port: u16) -> String {
        format!("http://{}:{}", self.host, port)
    }
}

impl Default for FileEngineProcessConfig {
    fn default() -> Self {
        Self::new("", &[])
    }
}

/// Both engine variants
///
/// # Example
///
/// ```toml
/// [engines.high_throughput]
/// command = "vllm"
/// args = ["serve", "{model}", "--port", "{port}"]
///
/// [engines.fallback]
/// command = "llama-server"
/// args = ["-hf", "{model}", "--port", "{port}"]
/// managed = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEnginesConfig {
    pub high_throughput: FileEngineProcessConfig,
    pub fallback: FileEngineProcessConfig,
}

impl Default for FileEnginesConfig {
    fn default() -> Self {
        Self {
            high_throughput: FileEngineProcessConfig::new(
                "vllm",
                &["serve", "{model}", "--port", "{port}", "--gpu-memory-utilization", "0.8"],
            ),
            fallback: FileEngineProcessConfig::new(
                "llama-server",
                &["-hf", "{model}", "--port", "{port}", "--ctx-size", "8192"],
            ),
        }
    }
}
