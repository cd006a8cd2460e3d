//! Use cases (application services)

pub mod retrieve_context;
pub mod run_reasoning;
pub mod stream_reasoning;

#[cfg(test)]
pub(crate) mod test_support;
