//! Generation limits (`[reasoning]` section)

use medreason_application::ReasoningParams;
use serde::{Deserialize, Serialize};

/// # Example
///
/// ```toml
/// [reasoning]
/// max_tokens = 1000
/// temperature = 0.2
/// sql_max_tokens = 200
/// sql_temperature = 0.2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReasoningConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub sql_max_tokens: u32,
    pub sql_temperature: f32,
}

impl Default for FileReasoningConfig {
    fn default() -> Self {
        let params = ReasoningParams::default();
        Self {
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            sql_max_tokens: params.sql_max_tokens,
            sql_temperature: params.sql_temperature,
        }
    }
}
