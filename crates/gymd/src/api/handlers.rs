//! API request handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use gymd_protocol::{
    CreateEnvironmentRequest, DeleteResponse, EnvironmentInfo, ResetRequest, ResetResponse,
    SessionList, StepRequest, StepResponse, TaskList,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Service banner.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub docs: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Service banner endpoint.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "gymd environment server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/tasks and /environments".to_string(),
    })
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List the tasks environments can be created for.
pub async fn list_tasks(State(state): State<AppState>) -> Json<TaskList> {
    Json(TaskList {
        tasks: state.registry.tasks(),
    })
}

/// Create an environment session.
#[instrument(skip(state, body))]
pub async fn create_environment(
    State(state): State<AppState>,
    body: Result<Json<CreateEnvironmentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EnvironmentInfo>)> {
    let Json(request) = body?;
    let created = state
        .registry
        .create(&request.task_name, request.kwargs)
        .await?;
    info!(session_id = %created.session_id, task_name = %created.task_name, "Created environment");
    Ok((StatusCode::CREATED, Json(created)))
}

/// List live sessions.
pub async fn list_environments(State(state): State<AppState>) -> Json<SessionList> {
    Json(SessionList {
        sessions: state.registry.list(),
    })
}

/// Get a session.
#[instrument(skip(state))]
pub async fn get_environment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<EnvironmentInfo>> {
    Ok(Json(state.registry.get(&session_id).await?))
}

/// Reset a session. The body is optional; an empty body resets without a seed.
#[instrument(skip(state, body))]
pub async fn reset_environment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ResetResponse>> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        serde_json::from_slice::<ResetRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid reset body: {}", e)))?
    };

    let reset = state.registry.reset(&session_id, request.seed).await?;
    debug!(session_id = %session_id, seed = ?request.seed, "Reset environment");
    Ok(Json(reset))
}

/// Step a session.
#[instrument(skip(state, body))]
pub async fn step_environment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<StepRequest>, JsonRejection>,
) -> ApiResult<Json<StepResponse>> {
    let Json(request) = body?;
    if let Some(body_id) = request
        .session_id
        .as_deref()
        .filter(|body_id| *body_id != session_id)
    {
        return Err(ApiError::bad_request(format!(
            "session_id in body ({}) does not match path ({})",
            body_id, session_id
        )));
    }

    Ok(Json(state.registry.step(&session_id, &request.action).await?))
}

/// Delete a session.
#[instrument(skip(state))]
pub async fn delete_environment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    state.registry.delete(&session_id).await?;
    info!(session_id = %session_id, "Deleted environment");
    Ok(Json(DeleteResponse::default()))
}
