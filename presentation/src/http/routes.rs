//! Routes and handlers

use super::error::ApiError;
use super::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::Stream;
use medreason_application::{ReasoningEvent, ReasoningResult, RunReasoningInput};
use medreason_domain::{CriteriaConfig, CriteriaSummary, Transcript};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Body of `POST /reason`.
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub input: String,
    #[serde(default)]
    pub conversation_history: Transcript,
    #[serde(default)]
    pub use_sql: bool,
    #[serde(default)]
    pub stream: bool,
}

/// Body of `POST /criteria`.
#[derive(Debug, Deserialize)]
pub struct NewCriteria {
    pub key: String,
    #[serde(flatten)]
    pub config: CriteriaConfig,
}

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct CriteriaListing {
    pub active: String,
    pub criteria: Vec<CriteriaSummary>,
}

#[derive(Debug, Serialize)]
pub struct ActiveCriteria {
    pub key: String,
    #[serde(flatten)]
    pub config: CriteriaConfig,
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/reason", post(reason_handler))
        .route("/progress", get(progress_handler))
        .route("/health", get(health_handler))
        .route("/criteria", get(list_criteria).post(add_criteria))
        .route("/criteria/active", get(active_criteria).post(set_active_criteria))
        .route("/criteria/{key}", delete(delete_criteria))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"))
}

fn to_sse(event: &ReasoningEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// Convert an event channel to an SSE stream.
///
/// Dropping the stream (client disconnect) cancels the producer.
fn event_stream(
    rx: mpsc::Receiver<ReasoningEvent>,
    cancel: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        let _cancel_on_drop = cancel.drop_guard();
        let mut rx = rx;
        while let Some(event) = rx.recv().await {
            debug!("SSE event: {}", event.name());
            yield Ok(to_sse(&event));
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn reason_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReasonRequest>,
) -> Response {
    let streaming = request.stream || wants_event_stream(&headers);
    let input = RunReasoningInput::new(request.input)
        .with_transcript(request.conversation_history)
        .with_sql(request.use_sql);

    if streaming {
        let cancel = CancellationToken::new();
        let rx = state.stream.spawn(input, cancel.clone());
        return event_stream(rx, cancel).into_response();
    }

    match state.reasoning.execute(input).await {
        Ok(result) => Json::<ReasoningResult>(result).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn progress_handler(State(state): State<AppState>) -> impl IntoResponse {
    let cancel = CancellationToken::new();
    let rx = state.stream.spawn_progress(cancel.clone());
    event_stream(rx, cancel)
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.monitor.snapshot();
    Json(json!({
        "status": "ok",
        "loading": snapshot.is_loading,
        "progress": snapshot.overall_percentage,
        "criteria": state.criteria.active_key(),
    }))
}

async fn list_criteria(State(state): State<AppState>) -> Json<CriteriaListing> {
    Json(CriteriaListing {
        active: state.criteria.active_key(),
        criteria: state.criteria.list(),
    })
}

async fn active_criteria(State(state): State<AppState>) -> Json<ActiveCriteria> {
    Json(ActiveCriteria {
        key: state.criteria.active_key(),
        config: state.criteria.get_active(),
    })
}

async fn set_active_criteria(
    State(state): State<AppState>,
    Json(body): Json<SetActive>,
) -> Result<Json<Value>, ApiError> {
    if !state.criteria.set_active(&body.key) {
        return Err(ApiError::not_found(format!("Unknown criteria '{}'", body.key)));
    }
    info!("Active criteria set to {}", body.key);
    Ok(Json(json!({ "active": body.key })))
}

async fn add_criteria(
    State(state): State<AppState>,
    Json(body): Json<NewCriteria>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.key.trim().is_empty() {
        return Err(ApiError::bad_request("Criteria key is empty"));
    }
    body.config
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !state.criteria.add_custom(&body.key, body.config) {
        return Err(ApiError::conflict(format!(
            "'{}' is a built-in criteria and cannot be replaced",
            body.key
        )));
    }
    Ok((StatusCode::CREATED, Json(json!({ "key": body.key }))))
}

async fn delete_criteria(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.criteria.delete_custom(&key) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("No custom criteria '{}'", key)))
    }
}
