//! Fallback handler over a llama.cpp-style server.
//!
//! The handler renders turns as a single ChatML prompt, tokenizes it on the
//! server, runs a completion over the token ids and detokenizes the result so
//! special tokens survive into the decoded text. The engine is not
//! reentrant, so generation calls queue behind a lock.

use crate::engines::error::{EngineError, check_status};
use crate::engines::launcher::EngineHandle;
use async_trait::async_trait;
use medreason_application::{HandlerError, ModelHandler, Readiness};
use medreason_domain::prompt::chat_format::{format_chatml, strip_prompt_echo, trim_end_of_turn};
use medreason_domain::{ConversationTurn, GenerationOptions, HandlerVariant, ModelResponse};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1000;
const SAMPLING_TOP_P: f32 = 0.95;

/// Token ids with their attention mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenizedPrompt {
    pub ids: Vec<i64>,
    pub attention_mask: Vec<u8>,
}

impl TokenizedPrompt {
    /// Derive an all-ones mask when the tokenizer supplied none.
    pub fn new(ids: Vec<i64>, attention_mask: Option<Vec<u8>>) -> Self {
        let attention_mask = match attention_mask {
            Some(mask) if mask.len() == ids.len() => mask,
            _ => vec![1; ids.len()],
        };
        Self {
            ids,
            attention_mask,
        }
    }

    /// Ids the model should attend to.
    pub fn attended(&self) -> Vec<i64> {
        self.ids
            .iter()
            .zip(&self.attention_mask)
            .filter(|(_, mask)| **mask == 1)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    content: &'a str,
    add_special: bool,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    tokens: Vec<i64>,
    #[serde(default)]
    attention_mask: Option<Vec<u8>>,
}

/// Request body for `POST /completion`.
#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest {
    prompt: Vec<i64>,
    n_predict: u32,
    temperature: f32,
    top_p: f32,
    return_tokens: bool,
    cache_prompt: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tokens: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct DetokenizeRequest<'a> {
    tokens: &'a [i64],
}

#[derive(Debug, Deserialize)]
struct DetokenizeResponse {
    content: String,
}

/// Sampling is enabled only for a positive temperature; otherwise greedy.
pub(crate) fn build_completion_request(
    prompt: &TokenizedPrompt,
    options: GenerationOptions,
) -> CompletionRequest {
    let (n_predict, temperature) = options.resolve(DEFAULT_MAX_NEW_TOKENS, DEFAULT_TEMPERATURE);
    let sampling = temperature > 0.0;
    CompletionRequest {
        prompt: prompt.attended(),
        n_predict,
        temperature: if sampling { temperature } else { 0.0 },
        top_p: if sampling { SAMPLING_TOP_P } else { 1.0 },
        return_tokens: true,
        cache_prompt: true,
    }
}

/// Clean decoded output: drop a prompt echo and anything past end-of-turn.
pub(crate) fn clean_decoded(decoded: &str, prompt: &str) -> String {
    trim_end_of_turn(strip_prompt_echo(decoded, prompt))
        .trim()
        .to_string()
}

/// CPU-capable handler that serializes generation.
pub struct FallbackHandler {
    backend_id: String,
    client: reqwest::Client,
    engine: EngineHandle,
    generation_lock: Mutex<()>,
}

impl FallbackHandler {
    pub fn new(engine_name: &str, client: reqwest::Client, engine: EngineHandle) -> Self {
        Self {
            backend_id: format!("{}:{}", HandlerVariant::Fallback.as_str(), engine_name),
            client,
            engine,
            generation_lock: Mutex::new(()),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, EngineError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.engine.base_url(), path);
        let response = self.client.post(&url).json(body).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn complete(
        &self,
        turns: &[ConversationTurn],
        options: GenerationOptions,
    ) -> Result<String, EngineError> {
        let prompt = format_chatml(turns);

        let tokenized: TokenizeResponse = self
            .post(
                "/tokenize",
                &TokenizeRequest {
                    content: &prompt,
                    add_special: false,
                },
            )
            .await?;
        let tokenized = TokenizedPrompt::new(tokenized.tokens, tokenized.attention_mask);
        debug!("Prompt is {} tokens", tokenized.ids.len());

        let completion: CompletionResponse = self
            .post("/completion", &build_completion_request(&tokenized, options))
            .await?;

        if completion.tokens.is_empty() {
            return Ok(clean_decoded(&completion.content, &prompt));
        }

        let decoded: DetokenizeResponse = self
            .post(
                "/detokenize",
                &DetokenizeRequest {
                    tokens: &completion.tokens,
                },
            )
            .await?;
        Ok(clean_decoded(&decoded.content, &prompt))
    }
}

#[async_trait]
impl ModelHandler for FallbackHandler {
    fn backend_id(&self) -> &str {
        &self.backend_id
    }

    fn variant(&self) -> HandlerVariant {
        HandlerVariant::Fallback
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
        let _guard = self.generation_lock.lock().await;
        let text = self
            .complete(turns, options)
            .await
            .map_err(|e| HandlerError::Generation(e.to_string()))?;
        Ok(ModelResponse::new(text, self.backend_id.clone()))
    }
}
