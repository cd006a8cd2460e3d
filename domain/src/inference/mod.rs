//! Inference domain: backend selection and generation value objects.

pub mod backend;
pub mod generation;
