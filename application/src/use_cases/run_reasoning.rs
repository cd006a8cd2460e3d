//! Run Reasoning use case.
//!
//! One turn of the multi-turn reasoning loop:
//!
//! ```text
//! New ──► AwaitingModel ──► NeedsInfo ──(next call)──► AwaitingModel
//!                      └──► Answered
//! ```
//!
//! A new session requires a patient identifier in the input. A continuation
//! recovers it from the prior transcript and never fails for lack of one.

use crate::config::ReasoningParams;
use crate::ports::context_retriever::ContextRetriever;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::criteria_registry::CriteriaRegistry;
use crate::ports::model_handler::{HandlerError, ModelHandler, ModelHandlerFactory};
use medreason_domain::core::string::preview;
use medreason_domain::{
    ConversationTurn, DomainError, ExtractedSections, ModelRole, PromptTemplate,
    ReasoningState, SqlStatus, TagDiagnostics, Transcript, extract_patient_id,
    patient_id_from_transcript,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a reasoning turn.
///
/// Retrieval failures and malformed model output are absorbed into
/// [`ReasoningResult`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunReasoningError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("{0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    Generation(String),
}

impl From<HandlerError> for RunReasoningError {
    fn from(e: HandlerError) -> Self {
        if e.is_unavailable() {
            RunReasoningError::BackendUnavailable(e.to_string())
        } else {
            RunReasoningError::Generation(e.to_string())
        }
    }
}

impl RunReasoningError {
    /// Stable wire name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RunReasoningError::Validation(_) => "validation",
            RunReasoningError::BackendUnavailable(_) => "backend_unavailable",
            RunReasoningError::Generation(_) => "generation",
        }
    }
}

/// Input for the [`RunReasoningUseCase`].
#[derive(Debug, Clone, Default)]
pub struct RunReasoningInput {
    /// New question, or additional information on a continuation.
    pub input: String,
    /// Prior turns; empty for a new session.
    pub transcript: Transcript,
    pub use_sql: bool,
}

impl RunReasoningInput {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn with_sql(mut self, use_sql: bool) -> Self {
        self.use_sql = use_sql;
        self
    }
}

/// Outcome of one reasoning turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// Raw assistant text.
    pub full_response: String,
    pub thinking: Option<String>,
    pub search_query: Option<String>,
    pub answer: Option<String>,
    pub requires_information: bool,
    pub state: ReasoningState,
    /// Prior transcript plus this turn's user and assistant turns.
    pub conversation_history: Transcript,
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_prompt: Option<String>,
    pub use_sql: bool,
    pub sql_status: SqlStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_error: Option<String>,
    pub backend: String,
    /// No section delimiters were found in the output.
    pub malformed_output: bool,
}

impl ReasoningResult {
    pub fn sections(&self) -> ExtractedSections {
        ExtractedSections {
            thinking: self.thinking.clone(),
            search_query: self.search_query.clone(),
            answer: self.answer.clone(),
        }
    }
}

struct Augmentation {
    content: String,
    status: SqlStatus,
    query: Option<String>,
    error: Option<String>,
}

/// Use case for one reasoning turn.
///
/// 1. Validate input and resolve the patient identifier
/// 2. Build the criteria system prompt from the active rubric
/// 3. Optionally splice a database excerpt into the user turn
/// 4. Generate, extract sections and decide the terminal state
pub struct RunReasoningUseCase {
    factory: Arc<dyn ModelHandlerFactory>,
    model: String,
    criteria: Arc<dyn CriteriaRegistry>,
    retriever: Option<Arc<dyn ContextRetriever>>,
    params: ReasoningParams,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl Clone for RunReasoningUseCase {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            model: self.model.clone(),
            criteria: self.criteria.clone(),
            retriever: self.retriever.clone(),
            params: self.params.clone(),
            conversation_logger: self.conversation_logger.clone(),
        }
    }
}

impl RunReasoningUseCase {
    pub fn new(
        factory: Arc<dyn ModelHandlerFactory>,
        model: impl Into<String>,
        criteria: Arc<dyn CriteriaRegistry>,
    ) -> Self {
        Self {
            factory,
            model: model.into(),
            criteria,
            retriever: None,
            params: ReasoningParams::default(),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContextRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_params(mut self, params: ReasoningParams) -> Self {
        self.params = params;
        self
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &ReasoningParams {
        &self.params
    }

    pub fn criteria(&self) -> &Arc<dyn CriteriaRegistry> {
        &self.criteria
    }

    /// The reasoning model handler (created on first use, then cached by the factory).
    pub async fn handler(&self) -> Result<Arc<dyn ModelHandler>, HandlerError> {
        self.factory
            .create_handler(&self.model, ModelRole::Reasoning)
            .await
    }

    /// Execute one reasoning turn.
    pub async fn execute(
        &self,
        input: RunReasoningInput,
    ) -> Result<ReasoningResult, RunReasoningError> {
        if input.input.trim().is_empty() {
            return Err(DomainError::EmptyInput.into());
        }

        let is_new = input.transcript.is_empty();
        let patient_id = if is_new {
            info!("Starting new reasoning session: {}", preview(&input.input, 100));
            extract_patient_id(&input.input)?
        } else {
            info!(
                "Continuing reasoning session ({} prior turns): {}",
                input.transcript.len(),
                preview(&input.input, 100)
            );
            patient_id_from_transcript(&input.transcript)
        };
        debug!("Patient ID: {}", patient_id);

        let criteria = self.criteria.get_active();
        let system_prompt = PromptTemplate::criteria_system(&criteria);

        let user_content = if is_new {
            input.input.clone()
        } else {
            PromptTemplate::continuation(&input.input)
        };

        self.conversation_logger.log(ConversationEvent::new(
            "reasoning_request",
            json!({
                "patient_id": patient_id,
                "input": input.input,
                "new_session": is_new,
                "criteria": criteria.name,
                "use_sql": input.use_sql,
            }),
        ));

        let augmentation = self
            .augment(&patient_id, &input.input, user_content, input.use_sql)
            .await;

        let mut messages = Vec::with_capacity(input.transcript.len() + 2);
        messages.push(ConversationTurn::system(system_prompt));
        messages.extend(input.transcript.non_system().cloned());
        messages.push(ConversationTurn::user(augmentation.content.clone()));

        let handler = self.handler().await?;
        let response = handler
            .generate(&messages, self.params.reasoning_options())
            .await
            .inspect_err(|e| warn!("Reasoning generation failed: {}", e))?;

        let sections = handler.extract_sections(&response.text);
        let diagnostics = TagDiagnostics::scan(&response.text);
        if diagnostics.has_partial() {
            warn!("Partial section delimiters in model output: {}", diagnostics);
        }
        let malformed_output = sections.is_empty();
        if malformed_output {
            warn!(
                "No structured sections in model output: {}",
                preview(&response.text, 120)
            );
        }
        debug!(
            "Extracted sections: thinking={}, search={}, answer={}",
            sections.thinking.is_some(),
            sections.search_query.is_some(),
            sections.answer.is_some()
        );

        let state = ReasoningState::decide(&sections, augmentation.status);
        if sections.requests_search() && state == ReasoningState::Answered {
            debug!("Search request suppressed: database excerpt already applied");
        }

        let conversation_history = input
            .transcript
            .with_exchange(augmentation.content, response.text.clone());

        self.conversation_logger.log(ConversationEvent::new(
            "reasoning_response",
            json!({
                "patient_id": patient_id,
                "backend": response.backend_id,
                "state": state,
                "bytes": response.text.len(),
                "text": response.text,
            }),
        ));

        info!(
            "Reasoning turn finished: state={}, backend={}",
            state, response.backend_id
        );

        Ok(ReasoningResult {
            full_response: response.text,
            thinking: sections.thinking,
            search_query: sections.search_query,
            answer: sections.answer,
            requires_information: state == ReasoningState::NeedsInfo,
            state,
            conversation_history,
            patient_id,
            original_prompt: is_new.then(|| input.input.clone()),
            use_sql: input.use_sql,
            sql_status: augmentation.status,
            sql_query: augmentation.query,
            sql_error: augmentation.error,
            backend: response.backend_id,
            malformed_output,
        })
    }

    /// Splice a database excerpt into the user turn; failures are absorbed.
    async fn augment(
        &self,
        patient_id: &str,
        question: &str,
        content: String,
        use_sql: bool,
    ) -> Augmentation {
        if !use_sql {
            return Augmentation {
                content,
                status: SqlStatus::NotRequested,
                query: None,
                error: None,
            };
        }

        let Some(retriever) = &self.retriever else {
            warn!("SQL augmentation requested but no database is configured");
            return Augmentation {
                content,
                status: SqlStatus::Failed,
                query: None,
                error: Some("SQL retrieval is not configured".to_string()),
            };
        };

        match retriever.retrieve(patient_id, question).await {
            Ok(result) => {
                let excerpt = result.excerpt();
                self.conversation_logger.log(ConversationEvent::new(
                    "sql_augmentation",
                    json!({
                        "query": result.query,
                        "rows": result.total_rows,
                        "truncated": result.truncated,
                    }),
                ));
                Augmentation {
                    content: PromptTemplate::with_information(&content, &excerpt),
                    status: SqlStatus::Applied,
                    query: Some(result.query),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Proceeding without database context: {}", e);
                self.conversation_logger.log(ConversationEvent::new(
                    "sql_augmentation",
                    json!({ "error": e.to_string() }),
                ));
                Augmentation {
                    content,
                    status: SqlStatus::Failed,
                    query: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::context_retriever::RetrievalError;
    use crate::use_cases::test_support::{FixedCriteria, MockFactory, MockHandler, MockRetriever};
    use medreason_domain::{Role, SqlRetrievalResult, SqlValue};

    fn use_case(handler: Arc<MockHandler>) -> RunReasoningUseCase {
        RunReasoningUseCase::new(MockFactory::new(handler), "reasoner", FixedCriteria::qsofa())
    }

    fn one_row() -> SqlRetrievalResult {
        SqlRetrievalResult::from_rows(
            "SELECT drug FROM prescriptions WHERE subject_id = 10000032;",
            vec!["drug".into()],
            vec![vec![SqlValue::Text("Vancomycin".into())]],
            10,
        )
    }

    #[tokio::test]
    async fn test_new_session_requires_patient_id() {
        let handler = MockHandler::texts(&["<answer>x</answer>"]);
        let err = use_case(handler.clone())
            .execute(RunReasoningInput::new("what is qSOFA?"))
            .await
            .unwrap_err();
        assert_eq!(err, RunReasoningError::Validation(DomainError::MissingPatientId));
        assert_eq!(err.kind(), "validation");
        assert_eq!(handler.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let err = use_case(MockHandler::texts(&[]))
            .execute(RunReasoningInput::new("   "))
            .await
            .unwrap_err();
        assert_eq!(err, RunReasoningError::Validation(DomainError::EmptyInput));
    }

    #[tokio::test]
    async fn test_new_session_needs_info() {
        let handler = MockHandler::texts(&[
            "<think>RR 24 meets one criterion</think><search>systolic blood pressure</search>",
        ]);
        let result = use_case(handler.clone())
            .execute(RunReasoningInput::new("patient 12345 has RR 24"))
            .await
            .unwrap();

        assert_eq!(result.patient_id, "12345");
        assert_eq!(result.state, ReasoningState::NeedsInfo);
        assert!(result.requires_information);
        assert_eq!(result.search_query.as_deref(), Some("systolic blood pressure"));
        assert_eq!(result.original_prompt.as_deref(), Some("patient 12345 has RR 24"));
        assert_eq!(result.sql_status, SqlStatus::NotRequested);
        assert_eq!(result.backend, "mock");
        assert!(!result.malformed_output);

        let (turns, options) = handler.last_call();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::System);
        assert!(turns[0].content.contains("qSOFA criteria to consider"));
        assert_eq!(turns[1].content, "patient 12345 has RR 24");
        assert_eq!(options.max_tokens, Some(1000));

        let history = result.conversation_history.turns();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, result.full_response);
    }

    #[tokio::test]
    async fn test_continuation_preserves_prefix_and_wraps_input() {
        let handler = MockHandler::texts(&[
            "<search>SBP</search>",
            "<think>two criteria met</think><answer>qSOFA positive</answer>",
        ]);
        let uc = use_case(handler.clone());

        let first = uc
            .execute(RunReasoningInput::new("admission=777 RR 24"))
            .await
            .unwrap();
        let second = uc
            .execute(
                RunReasoningInput::new("SBP is 90")
                    .with_transcript(first.conversation_history.clone()),
            )
            .await
            .unwrap();

        assert_eq!(second.patient_id, "777");
        assert_eq!(second.original_prompt, None);
        assert_eq!(second.state, ReasoningState::Answered);
        assert_eq!(second.answer.as_deref(), Some("qSOFA positive"));

        let prior = first.conversation_history.turns();
        let next = second.conversation_history.turns();
        assert_eq!(&next[..prior.len()], prior);
        assert_eq!(next.len(), prior.len() + 2);
        assert_eq!(
            next[2].content,
            "I'm providing additional information: SBP is 90. Please continue your assessment based on this new information."
        );

        let (turns, _) = handler.last_call();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[1], prior[0]);
    }

    #[tokio::test]
    async fn test_continuation_without_id_uses_unknown() {
        let handler = MockHandler::texts(&["<answer>done</answer>"]);
        let transcript = Transcript::from(vec![
            ConversationTurn::user("RR is 24"),
            ConversationTurn::assistant("<search>SBP</search>"),
        ]);
        let result = use_case(handler)
            .execute(RunReasoningInput::new("SBP 90").with_transcript(transcript))
            .await
            .unwrap();
        assert_eq!(result.patient_id, "unknown");
    }

    #[tokio::test]
    async fn test_sql_success_suppresses_search() {
        let handler = MockHandler::texts(&[
            "<think>on antibiotics</think><search>more labs</search><answer>Vancomycin</answer>",
        ]);
        let retriever = MockRetriever::new(Ok(one_row()));
        let uc = use_case(handler.clone()).with_retriever(retriever.clone());

        let result = uc
            .execute(RunReasoningInput::new("patient 10000032 is taking which drugs?").with_sql(true))
            .await
            .unwrap();

        assert!(!result.requires_information);
        assert_eq!(result.state, ReasoningState::Answered);
        assert_eq!(result.sql_status, SqlStatus::Applied);
        assert!(result.sql_query.is_some());
        assert_eq!(
            retriever.calls.lock().unwrap()[0],
            ("10000032".to_string(), "patient 10000032 is taking which drugs?".to_string())
        );

        let (turns, _) = handler.last_call();
        assert!(turns[1].content.contains("<information>\nColumns: drug\n('Vancomycin')\n</information>"));

        let history = result.conversation_history.turns();
        assert_eq!(history.last().unwrap().role, Role::Assistant);
        assert_eq!(history[0].content, turns[1].content);
    }

    #[tokio::test]
    async fn test_sql_failure_is_absorbed() {
        let handler = MockHandler::texts(&["<search>SBP</search>"]);
        let retriever = MockRetriever::new(Err(RetrievalError::Execution {
            query: "SELECT x;".into(),
            message: "no such column: x".into(),
        }));
        let result = use_case(handler.clone())
            .with_retriever(retriever)
            .execute(RunReasoningInput::new("patient 1 vitals").with_sql(true))
            .await
            .unwrap();

        assert!(result.use_sql);
        assert_eq!(result.sql_status, SqlStatus::Failed);
        assert!(result.sql_error.unwrap().contains("no such column"));
        assert!(result.requires_information);

        let (turns, _) = handler.last_call();
        assert_eq!(turns[1].content, "patient 1 vitals");
    }

    #[tokio::test]
    async fn test_sql_without_retriever_fails_softly() {
        let result = use_case(MockHandler::texts(&["<answer>a</answer>"]))
            .execute(RunReasoningInput::new("patient 1").with_sql(true))
            .await
            .unwrap();
        assert_eq!(result.sql_status, SqlStatus::Failed);
    }

    #[tokio::test]
    async fn test_malformed_output_still_returned() {
        let result = use_case(MockHandler::texts(&["<think>unterminated reasoning"]))
            .execute(RunReasoningInput::new("patient 5"))
            .await
            .unwrap();
        assert!(result.malformed_output);
        assert_eq!(result.full_response, "<think>unterminated reasoning");
        assert!(result.sections().is_empty());
        assert_eq!(result.state, ReasoningState::Answered);
    }

    #[tokio::test]
    async fn test_generation_error_preserves_caller_transcript() {
        let handler = MockHandler::new(vec![Err(HandlerError::Generation("CUDA OOM".into()))]);
        let transcript = Transcript::new().with_exchange("patient 9", "<search>x</search>");
        let input = RunReasoningInput::new("x is 3").with_transcript(transcript.clone());
        let err = use_case(handler).execute(input.clone()).await.unwrap_err();
        assert!(matches!(err, RunReasoningError::Generation(_)));
        assert_eq!(input.transcript, transcript);
    }

    #[tokio::test]
    async fn test_backend_unavailable() {
        let uc = RunReasoningUseCase::new(
            MockFactory::failing(HandlerError::BackendUnavailable("no engine".into())),
            "reasoner",
            FixedCriteria::qsofa(),
        );
        let err = uc.execute(RunReasoningInput::new("patient 1")).await.unwrap_err();
        assert_eq!(err.kind(), "backend_unavailable");
    }

    #[test]
    fn test_result_serializes_wire_fields() {
        let result = ReasoningResult {
            full_response: "<answer>a</answer>".into(),
            thinking: None,
            search_query: None,
            answer: Some("a".into()),
            requires_information: false,
            state: ReasoningState::Answered,
            conversation_history: Transcript::new().with_exchange("patient 1", "<answer>a</answer>"),
            patient_id: "1".into(),
            original_prompt: Some("patient 1".into()),
            use_sql: false,
            sql_status: SqlStatus::NotRequested,
            sql_query: None,
            sql_error: None,
            backend: "mock".into(),
            malformed_output: false,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["sql_status"], "not_requested");
        assert_eq!(value["state"], "answered");
        assert_eq!(value["conversation_history"][1]["role"], "assistant");
        assert!(value.get("sql_error").is_none());
    }
}
