//! Chat endpoint
//!
//! One POST per turn. Setup problems (no active LLM configuration) come
//! back as 400 with a `requires_setup` marker; everything else that escapes
//! the pipeline maps to a generic 500 with no internal detail.

use crate::server::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kubesage_core::ChatRequest;
use serde_json::json;
use tracing::error;

/// `POST /chat`
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Message is required" })),
        )
            .into_response();
    }

    match state.orchestrator.process_turn(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) if e.requires_setup() => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string(), "requires_setup": true })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": "Failed to process your request. Please try again."
                })),
            )
                .into_response()
        }
    }
}
