//! Runtime configuration endpoints
//!
//! The active LLM configuration and kubeconfig profile are swappable
//! records looked up per turn, not compile-time settings; these endpoints
//! are how an operator swaps them.

use crate::server::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kubesage_core::KubeconfigProfile;
use kubesage_llm::{LlmProviderConfig, ProviderFactory};
use serde_json::json;
use tracing::error;

/// `PUT /admin/llm-config` — store and activate an LLM configuration.
pub async fn set_llm_config(
    State(state): State<AppState>,
    Json(config): Json<LlmProviderConfig>,
) -> Response {
    // Reject configurations the factory could never build a provider from.
    if let Err(e) = state.factory.create(&config) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response();
    }

    match state.store.set_active_llm_config(&config).await {
        Ok(id) => Json(json!({ "id": id, "message": "LLM configuration activated" })).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to save LLM configuration");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save configuration" })),
            )
                .into_response()
        }
    }
}

/// `PUT /admin/kubeconfig` — store and activate a kubeconfig profile.
pub async fn set_kubeconfig(
    State(state): State<AppState>,
    Json(profile): Json<KubeconfigProfile>,
) -> Response {
    if profile.name.trim().is_empty() || profile.path.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Name and path are required" })),
        )
            .into_response();
    }

    match state.store.set_active_kubeconfig(&profile).await {
        Ok(id) => Json(json!({ "id": id, "message": "Kubeconfig activated" })).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to save kubeconfig");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save kubeconfig" })),
            )
                .into_response()
        }
    }
}
