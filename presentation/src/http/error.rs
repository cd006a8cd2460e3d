//! Error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use medreason_application::RunReasoningError;
use serde_json::json;

/// An error body `{"error": kind, "detail": message}` with its status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation", detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", detail)
    }
}

impl From<RunReasoningError> for ApiError {
    fn from(e: RunReasoningError) -> Self {
        let status = match e {
            RunReasoningError::Validation(_) => StatusCode::BAD_REQUEST,
            RunReasoningError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RunReasoningError::Generation(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.kind(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.kind, "detail": self.detail }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medreason_application::HandlerError;
    use medreason_domain::DomainError;

    #[test]
    fn test_reasoning_error_status_mapping() {
        let validation = ApiError::from(RunReasoningError::from(DomainError::EmptyInput));
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.detail, DomainError::EmptyInput.to_string());

        let unavailable = ApiError::from(RunReasoningError::from(
            HandlerError::BackendUnavailable("no engine".into()),
        ));
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.kind, "backend_unavailable");

        let generation =
            ApiError::from(RunReasoningError::from(HandlerError::Generation("502".into())));
        assert_eq!(generation.status, StatusCode::BAD_GATEWAY);
    }
}
