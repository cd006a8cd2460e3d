//! Reasoning domain.
//!
//! - [`sections`]: `<think>`/`<search>`/`<answer>` extraction
//! - [`patient`]: patient identifier extraction
//! - [`criteria`]: clinical rubrics and the built-in set
//! - [`outcome`]: turn state and database augmentation status

pub mod criteria;
pub mod outcome;
pub mod patient;
pub mod sections;
