//! Shared handler state

use medreason_application::{
    CriteriaRegistry, ProgressMonitor, RunReasoningUseCase, StreamReasoningUseCase,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub reasoning: RunReasoningUseCase,
    pub stream: StreamReasoningUseCase,
    pub criteria: Arc<dyn CriteriaRegistry>,
    pub monitor: Arc<ProgressMonitor>,
}

impl AppState {
    pub fn new(reasoning: RunReasoningUseCase, monitor: Arc<ProgressMonitor>) -> Self {
        let criteria = Arc::clone(reasoning.criteria());
        let stream = StreamReasoningUseCase::new(reasoning.clone(), Arc::clone(&monitor));
        Self {
            reasoning,
            stream,
            criteria,
            monitor,
        }
    }
}
