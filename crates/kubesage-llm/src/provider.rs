//! Provider trait and factory
//!
//! One trait exposes the four diagnostic capabilities; the two concrete
//! variants differ only in transport construction. Every method degrades to
//! a deterministic fallback on failure — callers never see an error from
//! these calls, so the orchestrator pipeline is uninterrupted.

use crate::config::{LlmProviderConfig, LlmTimeouts, ProviderKind};
use crate::error::{Error, Result};
use crate::extract::CommandRequest;
use crate::local::LocalProvider;
use crate::message::ChatMessage;
use crate::observation::CommandObservation;
use crate::openrouter::OpenRouterProvider;
use serde::Serialize;
use std::sync::Arc;

/// Hard cap on primary command suggestions, regardless of model output
pub const MAX_SUGGESTED_COMMANDS: usize = 3;

/// Hard cap on follow-up command suggestions
pub const MAX_FOLLOW_UP_COMMANDS: usize = 2;

/// Result of a connectivity probe
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTest {
    /// Whether the endpoint answered successfully
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Round-trip latency when the probe succeeded
    pub latency_ms: Option<u64>,
}

/// Static description of a provider instance
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    /// Variant name ("openrouter" or "local")
    pub provider: &'static str,
    /// Configured model
    pub model: String,
    /// Endpoint the provider talks to
    pub endpoint: String,
    /// Whether responses are requested as SSE streams
    pub supports_streaming: bool,
}

/// Capability interface over the LLM backend variants
#[async_trait::async_trait]
pub trait DiagnosticLlm: Send + Sync {
    /// Describe this provider instance
    fn provider_info(&self) -> ProviderInfo;

    /// Suggest up to [`MAX_SUGGESTED_COMMANDS`] diagnostic commands for a
    /// question. Returns an empty list when the backend fails.
    async fn suggest_commands(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Vec<CommandRequest>;

    /// Produce the user-facing narrative for collected command outputs.
    /// Falls back to a canned response when the backend fails.
    async fn analyze_outputs(
        &self,
        question: &str,
        outputs: &[CommandObservation],
        history: &[ChatMessage],
    ) -> String;

    /// Suggest up to [`MAX_FOLLOW_UP_COMMANDS`] deeper commands after
    /// reviewing first-round results. Empty on backend failure.
    async fn suggest_follow_up_commands(
        &self,
        question: &str,
        outputs: &[CommandObservation],
        history: &[ChatMessage],
    ) -> Vec<CommandRequest>;

    /// Probe backend connectivity with a minimal request.
    async fn test_connection(&self) -> ConnectionTest;
}

/// Builds a provider instance from the active configuration.
///
/// A fresh instance is constructed per turn; no provider state is shared
/// across turns.
pub trait ProviderFactory: Send + Sync {
    /// Construct the provider the configuration calls for.
    fn create(&self, config: &LlmProviderConfig) -> Result<Arc<dyn DiagnosticLlm>>;
}

/// Default factory producing the real backend variants
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    timeouts: LlmTimeouts,
}

impl ClientFactory {
    /// Create a factory with the given per-operation timeouts
    #[must_use]
    pub fn new(timeouts: LlmTimeouts) -> Self {
        Self { timeouts }
    }
}

impl ProviderFactory for ClientFactory {
    fn create(&self, config: &LlmProviderConfig) -> Result<Arc<dyn DiagnosticLlm>> {
        match config.provider {
            ProviderKind::OpenRouter => {
                let api_key = config.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(
                    || Error::NotConfigured("openrouter requires an API key".to_string()),
                )?;
                Ok(Arc::new(OpenRouterProvider::new(
                    api_key,
                    &config.model,
                    config.stream_responses,
                    self.timeouts.clone(),
                )?))
            }
            ProviderKind::Local => Ok(Arc::new(LocalProvider::new(
                config.endpoint_url.as_deref().unwrap_or("http://localhost:8080"),
                &config.model,
                config.stream_responses,
                self.timeouts.clone(),
            )?)),
        }
    }
}
