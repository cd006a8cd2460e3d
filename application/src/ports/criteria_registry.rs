//! Criteria registry port

use medreason_domain::{CriteriaConfig, CriteriaSummary};

/// Registry of clinical rubrics with one active selection.
///
/// The reasoning use case only reads [`CriteriaRegistry::get_active`].
pub trait CriteriaRegistry: Send + Sync {
    fn list(&self) -> Vec<CriteriaSummary>;

    /// Active rubric; an unknown active key resolves to the default rubric.
    fn get_active(&self) -> CriteriaConfig;

    fn active_key(&self) -> String;

    /// Returns false when `key` is not registered.
    fn set_active(&self, key: &str) -> bool;

    /// Returns false when `key` names a built-in rubric.
    fn add_custom(&self, key: &str, config: CriteriaConfig) -> bool;

    /// Returns false when `key` is not a custom rubric.
    fn delete_custom(&self, key: &str) -> bool;
}
