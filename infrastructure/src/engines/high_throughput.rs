//! High-throughput handler over an OpenAI-compatible chat-completions server.
//!
//! Generation stops at the closing `</search>` / `</answer>` delimiters and
//! the stop string is kept, so section extraction sees complete regions.

use crate::engines::error::{EngineError, check_status};
use crate::engines::launcher::EngineHandle;
use async_trait::async_trait;
use medreason_application::{HandlerError, ModelHandler, Readiness};
use medreason_domain::{
    ConversationTurn, GenerationOptions, HandlerVariant, ModelResponse, STOP_SEQUENCES,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_TOKENS: u32 = 10_000;

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    n: u32,
    stop: Vec<&'static str>,
    include_stop_str_in_output: bool,
    skip_special_tokens: bool,
    spaces_between_special_tokens: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub(crate) fn build_chat_request<'a>(
    model: &'a str,
    turns: &'a [ConversationTurn],
    options: GenerationOptions,
) -> ChatRequest<'a> {
    let (max_tokens, temperature) = options.resolve(DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE);
    ChatRequest {
        model,
        messages: turns
            .iter()
            .map(|t| ChatMessage {
                role: t.role.as_str(),
                content: &t.content,
            })
            .collect(),
        max_tokens,
        temperature,
        top_p: 1.0,
        n: 1,
        stop: STOP_SEQUENCES.to_vec(),
        include_stop_str_in_output: true,
        skip_special_tokens: false,
        spaces_between_special_tokens: false,
    }
}

pub(crate) fn decode_chat_response(response: ChatResponse) -> Result<String, EngineError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| EngineError::Decode("response has no choices".to_string()))
}

/// Batched engine handler; the server is reentrant so calls are not serialized.
pub struct HighThroughputHandler {
    backend_id: String,
    model: String,
    client: reqwest::Client,
    engine: EngineHandle,
}

impl HighThroughputHandler {
    pub fn new(model: &str, engine_name: &str, client: reqwest::Client, engine: EngineHandle) -> Self {
        Self {
            backend_id: format!("{}:{}", HandlerVariant::HighThroughput.as_str(), engine_name),
            model: model.to_string(),
            client,
            engine,
        }
    }

    async fn complete(
        &self,
        turns: &[ConversationTurn],
        options: GenerationOptions,
    ) -> Result<String, EngineError> {
        let url = format!("{}/v1/chat/completions", self.engine.base_url());
        let body = build_chat_request(&self.model, turns, options);
        debug!("POST {} ({} messages)", url, body.messages.len());

        let response = self.client.post(&url).json(&body).send().await?;
        let response: ChatResponse = check_status(response).await?.json().await?;
        decode_chat_response(response)
    }
}

#[async_trait]
impl ModelHandler for HighThroughputHandler {
    fn backend_id(&self) -> &str {
        &self.backend_id
    }

    fn variant(&self) -> HandlerVariant {
        HandlerVariant::HighThroughput
    }

    fn readiness(&self) -> Readiness {
        self.engine.readiness()
    }

    async fn generate(
        &self,
        turns: &[ConversationTurn],
        options: GenerationOptions,
    ) -> Result<ModelResponse, HandlerError> {
        self.engine.wait_ready().await?;
        let text = self
            .complete(turns, options)
            .await
            .map_err(|e| HandlerError::Generation(e.to_string()))?;
        Ok(ModelResponse::new(text, self.backend_id.clone()))
    }
}
