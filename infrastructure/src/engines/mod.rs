//! Inference engine adapters.
//!
//! | Variant | Server | API |
//! |---------|--------|-----|
//! | [`HighThroughputHandler`] | vLLM | OpenAI-compatible `/v1/chat/completions` |
//! | [`FallbackHandler`] | llama.cpp server | `/tokenize`, `/completion`, `/detokenize` |
//!
//! [`EngineHandlerFactory`] picks a variant from the capability detector,
//! launches or attaches to the engine, and caches the handler per model.

pub mod error;
mod factory;
mod fallback;
mod high_throughput;
mod launcher;

pub use error::EngineError;
pub use factory::EngineHandlerFactory;
pub use fallback::FallbackHandler;
pub use high_throughput::HighThroughputHandler;
pub use launcher::{EngineHandle, EngineSpec};
