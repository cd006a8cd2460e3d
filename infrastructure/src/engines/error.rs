//! Error types for the inference engine adapters

use medreason_application::HandlerError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when launching or talking to an inference engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn engine process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected engine response: {0}")]
    Decode(String),

    #[error("Engine exited: {0}")]
    Exited(String),

    #[error("Engine did not become ready within {0:?}")]
    Timeout(Duration),
}

impl From<EngineError> for HandlerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Spawn(_) | EngineError::Exited(_) | EngineError::Timeout(_) => {
                HandlerError::LoadFailed(err.to_string())
            }
            other => HandlerError::Generation(other.to_string()),
        }
    }
}

/// Reject non-success responses, keeping the body for diagnostics.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EngineError::Status {
        status: status.as_u16(),
        body,
    })
}
