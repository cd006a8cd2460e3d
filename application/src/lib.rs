//! Application layer for medreason
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod progress;
pub mod use_cases;

// Re-export commonly used types
pub use config::ReasoningParams;
pub use ports::{
    context_retriever::{ContextRetriever, QueryRows, RetrievalError, SqlExecutor, SqlExecutorError},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    criteria_registry::CriteriaRegistry,
    model_handler::{HandlerError, ModelHandler, ModelHandlerFactory, Readiness},
    progress::{ChannelSubscriber, ProgressSubscriber, SubscriberError},
};
pub use progress::{ProgressMonitor, SubscriptionGuard};
pub use use_cases::retrieve_context::SqlRetrievalService;
pub use use_cases::run_reasoning::{
    ReasoningResult, RunReasoningError, RunReasoningInput, RunReasoningUseCase,
};
pub use use_cases::stream_reasoning::{ReasoningEvent, ReasoningMetadata, StreamReasoningUseCase};
