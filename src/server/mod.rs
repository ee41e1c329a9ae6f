//! Server state and router assembly

pub mod config;

use crate::api;
use axum::routing::{get, post, put};
use axum::Router;
use config::AppConfig;
use kubesage_core::{ChatStore, Orchestrator};
use kubesage_llm::ClientFactory;
use kubesage_tools::KubectlExecutor;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The turn pipeline
    pub orchestrator: Arc<Orchestrator>,
    /// Durable storage
    pub store: Arc<dyn ChatStore>,
    /// Provider factory (health checks build a provider per probe)
    pub factory: Arc<ClientFactory>,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build an executor against the currently active kubeconfig.
    pub async fn executor(&self) -> KubectlExecutor {
        let orchestrator_config = &self.config.orchestrator;
        let mut executor = KubectlExecutor::new()
            .with_binary(&orchestrator_config.kubectl_binary)
            .with_timeouts(
                Duration::from_secs(orchestrator_config.command_timeout_secs),
                Duration::from_secs(orchestrator_config.probe_timeout_secs),
            );
        if let Ok(Some(profile)) = self.store.get_active_kubeconfig().await {
            executor = executor.with_kubeconfig(profile.path);
        }
        executor
    }
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/chat", post(api::chat::chat))
        .route(
            "/sessions/:session_id/history",
            get(api::sessions::get_history).delete(api::sessions::delete_history),
        )
        .route("/activity", get(api::sessions::get_activity))
        .route("/pods/:namespace/:pod/files", get(api::pods::browse_files))
        .route("/pods/:namespace/:pod/file", get(api::pods::read_file))
        .route("/admin/llm-config", put(api::admin::set_llm_config))
        .route("/admin/kubeconfig", put(api::admin::set_kubeconfig))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
