//! In-memory criteria registry.
//!
//! Built-in rubrics are fixed; custom rubrics live for the process lifetime.

use medreason_application::CriteriaRegistry;
use medreason_domain::reasoning::criteria::{builtin_criteria, is_builtin_key};
use medreason_domain::{CriteriaConfig, CriteriaSummary, DEFAULT_CRITERIA_KEY};
use std::sync::Mutex;
use tracing::{info, warn};

struct RegistryState {
    builtin: Vec<(String, CriteriaConfig)>,
    custom: Vec<(String, CriteriaConfig)>,
    active: String,
}

impl RegistryState {
    fn find(&self, key: &str) -> Option<&CriteriaConfig> {
        self.builtin
            .iter()
            .chain(self.custom.iter())
            .find(|(k, _)| k == key)
            .map(|(_, c)| c)
    }
}

/// Process-memory registry seeded with the built-in rubrics.
pub struct InMemoryCriteriaRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryCriteriaRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                builtin: builtin_criteria(),
                custom: Vec::new(),
                active: DEFAULT_CRITERIA_KEY.to_string(),
            }),
        }
    }

    /// Registry with `key` active when it names a known rubric.
    pub fn with_active(key: &str) -> Self {
        let registry = Self::new();
        if !registry.set_active(key) {
            warn!(
                "Unknown criteria '{}', using {}",
                key, DEFAULT_CRITERIA_KEY
            );
        }
        registry
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for InMemoryCriteriaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CriteriaRegistry for InMemoryCriteriaRegistry {
    fn list(&self) -> Vec<CriteriaSummary> {
        let state = self.lock();
        state
            .builtin
            .iter()
            .chain(state.custom.iter())
            .map(|(key, c)| CriteriaSummary {
                key: key.clone(),
                name: c.name.clone(),
                description: c.description.clone(),
            })
            .collect()
    }

    fn get_active(&self) -> CriteriaConfig {
        let state = self.lock();
        state
            .find(&state.active)
            .or_else(|| state.find(DEFAULT_CRITERIA_KEY))
            .cloned()
            .unwrap_or_else(medreason_domain::reasoning::criteria::qsofa)
    }

    fn active_key(&self) -> String {
        let state = self.lock();
        if state.find(&state.active).is_some() {
            state.active.clone()
        } else {
            DEFAULT_CRITERIA_KEY.to_string()
        }
    }

    fn set_active(&self, key: &str) -> bool {
        let mut state = self.lock();
        if state.find(key).is_none() {
            return false;
        }
        info!("Active criteria set to {}", key);
        state.active = key.to_string();
        true
    }

    fn add_custom(&self, key: &str, config: CriteriaConfig) -> bool {
        if key.trim().is_empty() || is_builtin_key(key) {
            return false;
        }
        let mut state = self.lock();
        match state.custom.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = config,
            None => state.custom.push((key.to_string(), config)),
        }
        true
    }

    fn delete_custom(&self, key: &str) -> bool {
        let mut state = self.lock();
        let before = state.custom.len();
        state.custom.retain(|(k, _)| k != key);
        if state.custom.len() == before {
            return false;
        }
        if state.active == key {
            state.active = DEFAULT_CRITERIA_KEY.to_string();
        }
        true
    }
}
