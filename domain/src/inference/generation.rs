//! Generation request and response value objects.

use serde::{Deserialize, Serialize};

/// What a model handler is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Reasoning,
    Sql,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Reasoning => "reasoning",
            ModelRole::Sql => "sql",
        }
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-call overrides layered onto an engine's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
        }
    }

    /// Resolve against engine defaults.
    pub fn resolve(&self, default_max_tokens: u32, default_temperature: f32) -> (u32, f32) {
        (
            self.max_tokens.unwrap_or(default_max_tokens),
            self.temperature.unwrap_or(default_temperature),
        )
    }
}

/// Generated text plus the identity of the handler that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub text: String,
    pub backend_id: String,
}

impl ModelResponse {
    pub fn new(text: impl Into<String>, backend_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            backend_id: backend_id.into(),
        }
    }
}
