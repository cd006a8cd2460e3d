//! Application-level configuration.
//!
//! - [`ReasoningParams`]: generation limits, row cap and progress polling

pub mod reasoning_params;

pub use reasoning_params::ReasoningParams;
