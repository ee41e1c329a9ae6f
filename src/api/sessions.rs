//! Session history and activity endpoints

use crate::server::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const DEFAULT_ACTIVITY_LIMIT: usize = 100;

/// Query parameters for list endpoints
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    /// Maximum entries to return
    pub limit: Option<usize>,
}

/// `GET /sessions/:session_id/history`
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state.store.load_turns(&session_id, limit).await {
        Ok(turns) => Json(json!({ "session_id": session_id, "history": turns })).into_response(),
        Err(e) => {
            error!(error = %e, session_id = %session_id, "Failed to load history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to get history" })),
            )
                .into_response()
        }
    }
}

/// `DELETE /sessions/:session_id/history`
///
/// Removes durable history and evicts the in-memory session state.
pub async fn delete_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.delete_history(&session_id).await {
        Ok(deleted) => {
            state.orchestrator.cache().remove(&session_id);
            Json(json!({ "session_id": session_id, "deleted": deleted })).into_response()
        }
        Err(e) => {
            error!(error = %e, session_id = %session_id, "Failed to delete history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to delete history" })),
            )
                .into_response()
        }
    }
}

/// `GET /activity`
pub async fn get_activity(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    match state.store.recent_activity(limit).await {
        Ok(entries) => Json(json!({ "logs": entries })).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to load activity log");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to get logs" })),
            )
                .into_response()
        }
    }
}
