//! Criteria rubric storage.

mod registry;

pub use registry::InMemoryCriteriaRegistry;
