//! Model handler port
//!
//! Defines the uniform capability surface of an inference backend and the
//! factory that selects one.

use async_trait::async_trait;
use medreason_domain::{
    ConversationTurn, ExtractedSections, GenerationOptions, HandlerVariant, ModelResponse,
    ModelRole, extract_sections,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while obtaining or using a model handler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("No inference backend available: {0}")]
    BackendUnavailable(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Model failed to load: {0}")]
    LoadFailed(String),
}

impl HandlerError {
    /// Unrecoverable for the request; no further downgrade exists.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            HandlerError::BackendUnavailable(_) | HandlerError::LoadFailed(_)
        )
    }
}

/// Load state of a handler's engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
    Failed(String),
}

/// A loaded (or loading) inference backend.
///
/// Implementations live in the infrastructure layer. A failed generation is
/// always an error; implementations never substitute empty text.
#[async_trait]
pub trait ModelHandler: Send + Sync {
    /// Implementation identity reported with every response.
    fn backend_id(&self) -> &str;

    fn variant(&self) -> HandlerVariant;

    fn readiness(&self) -> Readiness;

    /// True once the underlying engine can serve requests.
    fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    /// Generate a completion for the given turns.
    ///
    /// Waits for the engine to finish loading first.
    async fn generate(
        &self,
        turns: &[ConversationTurn],
        options: GenerationOptions,
    ) -> Result<ModelResponse, HandlerError>;

    /// Derive structured sections from generated text.
    fn extract_sections(&self, text: &str) -> ExtractedSections {
        extract_sections(text)
    }
}

/// Creates (and caches) model handlers.
#[async_trait]
pub trait ModelHandlerFactory: Send + Sync {
    /// Handler for `model`, reusing a cached instance when one exists.
    async fn create_handler(
        &self,
        model: &str,
        role: ModelRole,
    ) -> Result<Arc<dyn ModelHandler>, HandlerError>;
}
