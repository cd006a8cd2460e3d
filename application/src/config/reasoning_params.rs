//! Reasoning parameters for generation control.
//!
//! [`ReasoningParams`] groups the static parameters the reasoning use cases
//! pass to model handlers and the SQL retrieval service.

use medreason_domain::GenerationOptions;
use medreason_domain::retrieval::sql::DEFAULT_ROW_CAP;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generation and retrieval parameters.
///
/// | Call            | max_tokens | temperature |
/// |-----------------|------------|-------------|
/// | Reasoning turn  | 1000       | 0.2         |
/// | SQL generation  | 200        | 0.2         |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub sql_max_tokens: u32,
    pub sql_temperature: f32,
    /// Rows folded back into the prompt.
    pub row_cap: usize,
    /// How long the streaming loop waits for one progress notification.
    pub progress_poll_timeout: Duration,
}

impl Default for ReasoningParams {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.2,
            sql_max_tokens: 200,
            sql_temperature: 0.2,
            row_cap: DEFAULT_ROW_CAP,
            progress_poll_timeout: Duration::from_millis(500),
        }
    }
}

impl ReasoningParams {
    // ==================== Builder Methods ====================

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_sql_generation(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.sql_max_tokens = max_tokens;
        self.sql_temperature = temperature;
        self
    }

    pub fn with_row_cap(mut self, cap: usize) -> Self {
        self.row_cap = cap;
        self
    }

    pub fn with_progress_poll_timeout(mut self, timeout: Duration) -> Self {
        self.progress_poll_timeout = timeout;
        self
    }

    // ==================== Derived Options ====================

    pub fn reasoning_options(&self) -> GenerationOptions {
        GenerationOptions::new(self.max_tokens, self.temperature)
    }

    pub fn sql_options(&self) -> GenerationOptions {
        GenerationOptions::new(self.sql_max_tokens, self.sql_temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ReasoningParams::default();
        assert_eq!(params.reasoning_options(), GenerationOptions::new(1000, 0.2));
        assert_eq!(params.sql_options(), GenerationOptions::new(200, 0.2));
        assert_eq!(params.row_cap, 10);
    }

    #[test]
    fn test_builders() {
        let params = ReasoningParams::default()
            .with_max_tokens(512)
            .with_sql_generation(128, 0.0)
            .with_row_cap(3)
            .with_progress_poll_timeout(Duration::from_millis(50));
        assert_eq!(params.max_tokens, 512);
        assert_eq!(params.sql_options().max_tokens, Some(128));
        assert_eq!(params.row_cap, 3);
        assert_eq!(params.progress_poll_timeout, Duration::from_millis(50));
    }
}
