//! Health endpoint with component-level diagnostics
//!
//! Checks the database, kubectl/cluster reachability (short probe), and
//! LLM connectivity in one response. The kubectl probe distinguishes a
//! missing binary from an unreachable cluster so the two get different
//! remediation.

use crate::server::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kubesage_llm::{DiagnosticLlm, ProviderFactory};
use serde::Serialize;
use std::time::Instant;

/// Overall health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    checks: HealthChecks,
}

#[derive(Debug, Serialize)]
struct HealthChecks {
    database: ComponentHealth,
    kubernetes: ComponentHealth,
    llm: ComponentHealth,
}

#[derive(Debug, Serialize)]
struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn status_with_error(status: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy" || self.status == "connected"
    }
}

async fn check_database(state: &AppState) -> ComponentHealth {
    let started = Instant::now();
    match state.store.health_check().await {
        Ok(()) => ComponentHealth::healthy(started.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::status_with_error("unhealthy", e.to_string()),
    }
}

async fn check_kubernetes(state: &AppState) -> ComponentHealth {
    let started = Instant::now();
    let result = state.executor().await.probe_cluster().await;
    if result.success {
        ComponentHealth::healthy(started.elapsed().as_millis() as u64)
    } else if !result.tool_available {
        ComponentHealth::status_with_error(
            "kubectl_missing",
            result.error.unwrap_or_else(|| "kubectl not found".to_string()),
        )
    } else if !result.target_reachable {
        ComponentHealth::status_with_error(
            "cluster_unreachable",
            result
                .error
                .unwrap_or_else(|| "cluster is not reachable".to_string()),
        )
    } else {
        ComponentHealth::status_with_error(
            "cluster_error",
            result.error.unwrap_or(result.stderr),
        )
    }
}

async fn check_llm(state: &AppState) -> ComponentHealth {
    let active = match state.store.get_active_llm_config().await {
        Ok(Some(config)) => config,
        Ok(None) => {
            return ComponentHealth::status_with_error(
                "not_configured",
                "no active LLM configuration",
            )
        }
        Err(e) => return ComponentHealth::status_with_error("unhealthy", e.to_string()),
    };

    match state.factory.create(&active) {
        Ok(provider) => {
            let test = provider.test_connection().await;
            if test.success {
                ComponentHealth::healthy(test.latency_ms.unwrap_or(0))
            } else {
                ComponentHealth::status_with_error("unreachable", test.message)
            }
        }
        Err(e) => ComponentHealth::status_with_error("misconfigured", e.to_string()),
    }
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Response {
    let checks = HealthChecks {
        database: check_database(&state).await,
        kubernetes: check_kubernetes(&state).await,
        llm: check_llm(&state).await,
    };

    // The database is load-bearing; cluster and LLM problems degrade.
    let (status, code) = if !checks.database.is_healthy() {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    } else if !checks.kubernetes.is_healthy() || !checks.llm.is_healthy() {
        ("degraded", StatusCode::OK)
    } else {
        ("healthy", StatusCode::OK)
    };

    (
        code,
        Json(HealthResponse {
            status,
            service: "kubesage",
            version: env!("CARGO_PKG_VERSION"),
            checks,
        }),
    )
        .into_response()
}
