//! Caching handler factory with backend downgrade.

use crate::config::{
    FileConfig, FileEngineConfig, FileEngineProcessConfig, FileEnginesConfig, FileModelsConfig,
};
use crate::engines::error::EngineError;
use crate::engines::fallback::FallbackHandler;
use crate::engines::high_throughput::HighThroughputHandler;
use crate::engines::launcher::{EngineHandle, EngineSpec};
use crate::hardware::CapabilityDetector;
use async_trait::async_trait;
use medreason_application::{
    HandlerError, ModelHandler, ModelHandlerFactory, ProgressMonitor, Readiness,
};
use medreason_domain::{HandlerVariant, ModelRole};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Creates engine-backed handlers, one per model identifier.
///
/// Selection follows the detector's recommendation; an ineligible or
/// unlaunchable high-throughput engine downgrades to the fallback engine.
/// Handlers whose engine failed to load are discarded on the next request;
/// a model whose high-throughput engine failed is served by the fallback
/// engine from then on.
pub struct EngineHandlerFactory {
    models: FileModelsConfig,
    engine: FileEngineConfig,
    engines: FileEnginesConfig,
    detector: Arc<CapabilityDetector>,
    monitor: Arc<ProgressMonitor>,
    client: reqwest::Client,
    cache: Mutex<HandlerCache>,
}

#[derive(Default)]
struct HandlerCache {
    handlers: HashMap<String, Arc<dyn ModelHandler>>,
    /// Models whose high-throughput engine failed after launch.
    downgraded: HashSet<String>,
}

impl EngineHandlerFactory {
    pub fn new(
        config: &FileConfig,
        detector: Arc<CapabilityDetector>,
        monitor: Arc<ProgressMonitor>,
    ) -> Self {
        Self {
            models: config.models.clone(),
            engine: config.engine.clone(),
            engines: config.engines.clone(),
            detector,
            monitor,
            client: reqwest::Client::new(),
            cache: Mutex::new(HandlerCache::default()),
        }
    }

    /// Number of cached handlers.
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.handlers.len()
    }

    /// Whether `model` is pinned to the fallback engine.
    pub async fn is_downgraded(&self, model: &str) -> bool {
        self.cache.lock().await.downgraded.contains(model)
    }

    fn port_for(&self, model: &str, role: ModelRole) -> u16 {
        self.models.port_for(model).unwrap_or(match role {
            ModelRole::Reasoning => self.models.reasoning_port,
            ModelRole::Sql => self.models.sql_port,
        })
    }

    fn process_config(&self, variant: HandlerVariant) -> &FileEngineProcessConfig {
        match variant {
            HandlerVariant::HighThroughput => &self.engines.high_throughput,
            HandlerVariant::Fallback => &self.engines.fallback,
        }
    }

    fn choose_variant(&self, downgraded: bool) -> Result<HandlerVariant, HandlerError> {
        let profile = self.detector.detect();
        if profile.recommended.variant() == HandlerVariant::HighThroughput {
            let eligibility = self.detector.can_use_high_throughput();
            if downgraded {
                info!("High-throughput engine failed to load earlier, using fallback");
            } else if eligibility.usable {
                return Ok(HandlerVariant::HighThroughput);
            } else {
                warn!(
                    "High-throughput backend unavailable ({}), falling back",
                    eligibility.reason
                );
            }
        }
        let eligibility = self.detector.can_use_fallback();
        if eligibility.usable {
            Ok(HandlerVariant::Fallback)
        } else {
            Err(HandlerError::BackendUnavailable(eligibility.reason))
        }
    }

    fn start(
        &self,
        variant: HandlerVariant,
        model: &str,
        port: u16,
    ) -> Result<Arc<dyn ModelHandler>, EngineError> {
        let process = self.process_config(variant);
        let spec = EngineSpec {
            label: format!("{}:{}", process.command, model),
            command: process.command.clone(),
            args: process.render_args(model, port),
            base_url: process.base_url(port),
            managed: process.managed,
            load_timeout: self.engine.load_timeout(),
            health_interval: self.engine.health_interval(),
        };
        let engine = EngineHandle::start(spec, self.client.clone(), Arc::clone(&self.monitor))?;

        let handler: Arc<dyn ModelHandler> = match variant {
            HandlerVariant::HighThroughput => Arc::new(HighThroughputHandler::new(
                model,
                &process.command,
                self.client.clone(),
                engine,
            )),
            HandlerVariant::Fallback => Arc::new(FallbackHandler::new(
                &process.command,
                self.client.clone(),
                engine,
            )),
        };
        Ok(handler)
    }
}

#[async_trait]
impl ModelHandlerFactory for EngineHandlerFactory {
    async fn create_handler(
        &self,
        model: &str,
        role: ModelRole,
    ) -> Result<Arc<dyn ModelHandler>, HandlerError> {
        self.detector.warm_up().await;

        let mut cache = self.cache.lock().await;
        if let Some(handler) = cache.handlers.get(model) {
            if !matches!(handler.readiness(), Readiness::Failed(_)) {
                return Ok(Arc::clone(handler));
            }
            warn!("Discarding {} handler for {} after load failure", handler.backend_id(), model);
            if handler.variant() == HandlerVariant::HighThroughput {
                cache.downgraded.insert(model.to_string());
            }
            cache.handlers.remove(model);
        }

        let port = self.port_for(model, role);
        let variant = self.choose_variant(cache.downgraded.contains(model))?;

        let handler = match self.start(variant, model, port) {
            Ok(handler) => handler,
            Err(e) if variant == HandlerVariant::HighThroughput => {
                warn!("Could not start high-throughput engine ({}), falling back", e);
                let eligibility = self.detector.can_use_fallback();
                if !eligibility.usable {
                    return Err(HandlerError::BackendUnavailable(eligibility.reason));
                }
                self.start(HandlerVariant::Fallback, model, port)
                    .map_err(|e| HandlerError::BackendUnavailable(e.to_string()))?
            }
            Err(e) => return Err(HandlerError::BackendUnavailable(e.to_string())),
        };

        info!(
            "Created {} handler for {} model {} on port {}",
            handler.backend_id(),
            role,
            model,
            port
        );
        cache.handlers.insert(model.to_string(), Arc::clone(&handler));
        Ok(handler)
    }
}
