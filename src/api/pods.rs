//! Read-only in-pod file inspection endpoints
//!
//! Both operations go through the executor's path-safety check; there is no
//! write surface here.

use crate::server::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

/// Query parameter naming the in-pod path
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    /// File or directory path inside the pod
    pub path: Option<String>,
}

/// `GET /pods/:namespace/:pod/files` — list a directory inside a pod.
pub async fn browse_files(
    State(state): State<AppState>,
    Path((namespace, pod)): Path<(String, String)>,
    Query(query): Query<PathQuery>,
) -> Response {
    let path = query.path.unwrap_or_else(|| "/".to_string());
    let listing = state.executor().await.browse_pod_files(&namespace, &pod, &path).await;

    if listing.success {
        Json(json!({
            "namespace": namespace,
            "pod": pod,
            "path": listing.path,
            "files": listing.files,
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": listing.error.unwrap_or_else(|| "failed to list files".to_string()) })),
        )
            .into_response()
    }
}

/// `GET /pods/:namespace/:pod/file` — read a file from inside a pod.
pub async fn read_file(
    State(state): State<AppState>,
    Path((namespace, pod)): Path<(String, String)>,
    Query(query): Query<PathQuery>,
) -> Response {
    let Some(path) = query.path.filter(|p| !p.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "path query parameter is required" })),
        )
            .into_response();
    };

    let content = state.executor().await.read_pod_file(&namespace, &pod, &path).await;
    if content.success {
        Json(json!({
            "namespace": namespace,
            "pod": pod,
            "path": path,
            "content": content.content,
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": content.error.unwrap_or_else(|| "failed to read file".to_string()) })),
        )
            .into_response()
    }
}
