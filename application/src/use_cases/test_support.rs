//! Scripted port implementations shared by the use case tests.

use crate::ports::context_retriever::{ContextRetriever, RetrievalError};
use crate::ports::criteria_registry::CriteriaRegistry;
use crate::ports::model_handler::{HandlerError, ModelHandler, ModelHandlerFactory, Readiness};
use async_trait::async_trait;
use medreason_domain::reasoning::criteria::qsofa;
use medreason_domain::{
    ConversationTurn, CriteriaConfig, CriteriaSummary, GenerationOptions, HandlerVariant,
    ModelResponse, ModelRole, SqlRetrievalResult,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct MockHandler {
    responses: Mutex<VecDeque<Result<String, HandlerError>>>,
    pub calls: Mutex<Vec<(Vec<ConversationTurn>, GenerationOptions)>>,
    ready: AtomicBool,
}

impl MockHandler {
    pub fn new(responses: Vec<Result<String, HandlerError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::from(responses)),
            calls: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
        })
    }

    pub fn texts(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn last_call(&self) -> (Vec<ConversationTurn>, GenerationOptions) {
        self.calls.lock().unwrap().last().cloned().expect("no calls")
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelHandler for MockHandler {
    fn backend_id(&self) -> &str {
        "mock"
    }

    fn variant(&self) -> HandlerVariant {
        HandlerVariant::Fallback
    }

    fn readiness(&self) -> Readiness {
        if self.ready.load(Ordering::SeqCst) {
            Readiness::Ready
        } else {
            Readiness::Loading
        }
    }

    async fn generate(
        &self,
        turns: &[ConversationTurn],
        options: GenerationOptions,
    ) -> Result<ModelResponse, HandlerError> {
        self.calls.lock().unwrap().push((turns.to_vec(), options));
        let text = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(HandlerError::Generation("No more responses".into())))?;
        Ok(ModelResponse::new(text, "mock"))
    }
}

pub struct MockFactory {
    handler: Arc<MockHandler>,
    failure: Option<HandlerError>,
}

impl MockFactory {
    pub fn new(handler: Arc<MockHandler>) -> Arc<Self> {
        Arc::new(Self {
            handler,
            failure: None,
        })
    }

    pub fn failing(error: HandlerError) -> Arc<Self> {
        Arc::new(Self {
            handler: MockHandler::new(vec![]),
            failure: Some(error),
        })
    }
}

#[async_trait]
impl ModelHandlerFactory for MockFactory {
    async fn create_handler(
        &self,
        _model: &str,
        _role: ModelRole,
    ) -> Result<Arc<dyn ModelHandler>, HandlerError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(self.handler.clone()),
        }
    }
}

/// Registry that always answers with one rubric.
pub struct FixedCriteria(pub CriteriaConfig);

impl FixedCriteria {
    pub fn qsofa() -> Arc<Self> {
        Arc::new(Self(qsofa()))
    }
}

impl CriteriaRegistry for FixedCriteria {
    fn list(&self) -> Vec<CriteriaSummary> {
        vec![CriteriaSummary {
            key: self.0.name.clone(),
            name: self.0.name.clone(),
            description: self.0.description.clone(),
        }]
    }

    fn get_active(&self) -> CriteriaConfig {
        self.0.clone()
    }

    fn active_key(&self) -> String {
        self.0.name.clone()
    }

    fn set_active(&self, _key: &str) -> bool {
        false
    }

    fn add_custom(&self, _key: &str, _config: CriteriaConfig) -> bool {
        false
    }

    fn delete_custom(&self, _key: &str) -> bool {
        false
    }
}

pub struct MockRetriever {
    result: Result<SqlRetrievalResult, RetrievalError>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl MockRetriever {
    pub fn new(result: Result<SqlRetrievalResult, RetrievalError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ContextRetriever for MockRetriever {
    async fn retrieve(
        &self,
        patient_id: &str,
        question: &str,
    ) -> Result<SqlRetrievalResult, RetrievalError> {
        self.calls
            .lock()
            .unwrap()
            .push((patient_id.to_string(), question.to_string()));
        self.result.clone()
    }
}
