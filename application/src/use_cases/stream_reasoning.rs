//! Stream Reasoning use case.
//!
//! Wraps [`RunReasoningUseCase`] and produces an ordered sequence of
//! [`ReasoningEvent`]s for a long-lived client connection:
//!
//! ```text
//! progress* → thinking? → search? → answer? → full → conversation → metadata → done
//! ```
//!
//! Any failure is reported as an `error` event, still followed by `done`.
//! Events are sent over a bounded channel; when the receiver goes away the
//! stream stops producing.

use super::run_reasoning::{
    ReasoningResult, RunReasoningError, RunReasoningInput, RunReasoningUseCase,
};
use crate::ports::model_handler::{ModelHandler, Readiness};
use crate::ports::progress::ChannelSubscriber;
use crate::progress::{ProgressMonitor, SubscriptionGuard};
use medreason_domain::{ProgressSnapshot, ReasoningState, SqlStatus, Transcript};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 32;

/// Non-text fields of a [`ReasoningResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningMetadata {
    pub requires_information: bool,
    pub state: ReasoningState,
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_prompt: Option<String>,
    pub use_sql: bool,
    pub sql_status: SqlStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_error: Option<String>,
    pub backend: String,
    pub malformed_output: bool,
}

impl From<&ReasoningResult> for ReasoningMetadata {
    fn from(r: &ReasoningResult) -> Self {
        Self {
            requires_information: r.requires_information,
            state: r.state,
            patient_id: r.patient_id.clone(),
            original_prompt: r.original_prompt.clone(),
            use_sql: r.use_sql,
            sql_status: r.sql_status,
            sql_query: r.sql_query.clone(),
            sql_error: r.sql_error.clone(),
            backend: r.backend.clone(),
            malformed_output: r.malformed_output,
        }
    }
}

/// A typed, incrementally flushed message to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ReasoningEvent {
    Progress(ProgressSnapshot),
    Thinking(String),
    Search(String),
    Answer(String),
    Full(String),
    Conversation(Transcript),
    Metadata(ReasoningMetadata),
    Error { kind: String, message: String },
    Done,
}

impl ReasoningEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ReasoningEvent::Progress(_) => "progress",
            ReasoningEvent::Thinking(_) => "thinking",
            ReasoningEvent::Search(_) => "search",
            ReasoningEvent::Answer(_) => "answer",
            ReasoningEvent::Full(_) => "full",
            ReasoningEvent::Conversation(_) => "conversation",
            ReasoningEvent::Metadata(_) => "metadata",
            ReasoningEvent::Error { .. } => "error",
            ReasoningEvent::Done => "done",
        }
    }

    fn from_error(e: &RunReasoningError) -> Self {
        ReasoningEvent::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }

    /// Result events in emission order, without the terminator.
    pub fn from_result(result: &ReasoningResult) -> Vec<ReasoningEvent> {
        let mut events = Vec::with_capacity(6);
        if let Some(thinking) = &result.thinking {
            events.push(ReasoningEvent::Thinking(thinking.clone()));
        }
        if let Some(search) = &result.search_query {
            events.push(ReasoningEvent::Search(search.clone()));
        }
        if let Some(answer) = &result.answer {
            events.push(ReasoningEvent::Answer(answer.clone()));
        }
        events.push(ReasoningEvent::Full(result.full_response.clone()));
        events.push(ReasoningEvent::Conversation(
            result.conversation_history.clone(),
        ));
        events.push(ReasoningEvent::Metadata(ReasoningMetadata::from(result)));
        events
    }
}

/// Sends to the client; false once the client is gone.
async fn emit(tx: &mpsc::Sender<ReasoningEvent>, event: ReasoningEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// Use case for streaming one reasoning turn.
#[derive(Clone)]
pub struct StreamReasoningUseCase {
    reasoning: RunReasoningUseCase,
    monitor: Arc<ProgressMonitor>,
    poll_timeout: Duration,
}

impl StreamReasoningUseCase {
    pub fn new(reasoning: RunReasoningUseCase, monitor: Arc<ProgressMonitor>) -> Self {
        let poll_timeout = reasoning.params().progress_poll_timeout;
        Self {
            reasoning,
            monitor,
            poll_timeout,
        }
    }

    /// Start streaming in a background task.
    pub fn spawn(
        &self,
        input: RunReasoningInput,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ReasoningEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let this = self.clone();
        tokio::spawn(async move { this.run(input, tx, cancel).await });
        rx
    }

    /// Stream model loading progress only, ending with `done`.
    pub fn spawn_progress(&self, cancel: CancellationToken) -> mpsc::Receiver<ReasoningEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let this = self.clone();
        tokio::spawn(async move {
            match this.reasoning.handler().await {
                Ok(handler) => {
                    if !this.relay_progress(handler.as_ref(), &tx, &cancel).await {
                        return;
                    }
                }
                Err(e) => {
                    let err = RunReasoningError::from(e);
                    if !emit(&tx, ReasoningEvent::from_error(&err)).await {
                        return;
                    }
                }
            }
            emit(&tx, ReasoningEvent::Done).await;
        });
        rx
    }

    /// Produce all events for one turn into `tx`.
    pub async fn run(
        &self,
        input: RunReasoningInput,
        tx: mpsc::Sender<ReasoningEvent>,
        cancel: CancellationToken,
    ) {
        match self.reasoning.handler().await {
            Ok(handler) => {
                if !handler.is_ready() && !self.relay_progress(handler.as_ref(), &tx, &cancel).await
                {
                    return;
                }
            }
            Err(e) => {
                let err = RunReasoningError::from(e);
                warn!("No reasoning backend: {}", err);
                if emit(&tx, ReasoningEvent::from_error(&err)).await {
                    emit(&tx, ReasoningEvent::Done).await;
                }
                return;
            }
        }

        let reasoning = self.reasoning.clone();
        let task = tokio::spawn(async move { reasoning.execute(input).await });

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Client disconnected; dropping reasoning result");
                return;
            }
            outcome = task => outcome,
        };

        let events = match outcome {
            Ok(Ok(result)) => ReasoningEvent::from_result(&result),
            Ok(Err(e)) => {
                info!("Reasoning turn failed: {}", e);
                vec![ReasoningEvent::from_error(&e)]
            }
            Err(join_error) => {
                let err = RunReasoningError::Generation(format!(
                    "reasoning task failed: {}",
                    join_error
                ));
                vec![ReasoningEvent::from_error(&err)]
            }
        };

        for event in events {
            if cancel.is_cancelled() || !emit(&tx, event).await {
                debug!("Client gone; stopping stream");
                return;
            }
        }
        emit(&tx, ReasoningEvent::Done).await;
    }

    /// Forward deduplicated progress snapshots until loading settles.
    ///
    /// Returns false when the client went away.
    async fn relay_progress(
        &self,
        handler: &dyn ModelHandler,
        tx: &mpsc::Sender<ReasoningEvent>,
        cancel: &CancellationToken,
    ) -> bool {
        let (subscriber, mut rx) = ChannelSubscriber::new();
        let _guard = SubscriptionGuard::new(self.monitor.clone(), Arc::new(subscriber));
        let mut last: Option<ProgressSnapshot> = None;

        let current = self.monitor.snapshot();
        if current.is_loading || !current.files.is_empty() {
            if current.is_settled() {
                return emit(tx, ReasoningEvent::Progress(current)).await;
            }
            if !emit(tx, ReasoningEvent::Progress(current.clone())).await {
                return false;
            }
            last = Some(current);
        }

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return false,
                next = tokio::time::timeout(self.poll_timeout, rx.recv()) => next,
            };

            match next {
                Ok(Some(snapshot)) => {
                    let settled = snapshot.is_settled();
                    let changed = last.as_ref().is_none_or(|l| !l.same_state(&snapshot));
                    if changed {
                        if !emit(tx, ReasoningEvent::Progress(snapshot.clone())).await {
                            return false;
                        }
                        last = Some(snapshot);
                    }
                    if settled {
                        return true;
                    }
                }
                Ok(None) => return true,
                Err(_) => match handler.readiness() {
                    Readiness::Ready => return true,
                    Readiness::Failed(reason) => {
                        debug!("Engine failed to load: {}", reason);
                        return true;
                    }
                    Readiness::Loading => {
                        if self.monitor.snapshot().is_settled() {
                            return true;
                        }
                    }
                },
            }
        }
    }
}
