//! OpenRouter hosted provider
//!
//! Multi-model gateway reached with a bearer key. Transport construction is
//! the only thing this file owns; the capability bodies live in the shared
//! engine.

use crate::config::LlmTimeouts;
use crate::engine::ChatEngine;
use crate::error::Result;
use crate::extract::CommandRequest;
use crate::message::ChatMessage;
use crate::observation::CommandObservation;
use crate::provider::{ConnectionTest, DiagnosticLlm, ProviderInfo};
use crate::transport::ChatTransport;
use tracing::instrument;

/// OpenRouter chat-completions endpoint
pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Hosted multi-model provider
pub struct OpenRouterProvider {
    engine: ChatEngine,
    model: String,
    stream: bool,
}

impl OpenRouterProvider {
    /// Create a provider for the given key and model
    pub fn new(
        api_key: &str,
        model: &str,
        stream: bool,
        timeouts: LlmTimeouts,
    ) -> Result<Self> {
        let transport = ChatTransport::new(OPENROUTER_API_URL, model, stream)?
            .with_bearer(api_key)
            .with_header("HTTP-Referer", "https://github.com/kubesage/kubesage")
            .with_header("X-Title", "Kubesage");
        Ok(Self {
            engine: ChatEngine::new(transport, timeouts),
            model: model.to_string(),
            stream,
        })
    }
}

#[async_trait::async_trait]
impl DiagnosticLlm for OpenRouterProvider {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "openrouter",
            model: self.model.clone(),
            endpoint: OPENROUTER_API_URL.to_string(),
            supports_streaming: self.stream,
        }
    }

    #[instrument(skip(self, history), fields(model = %self.model))]
    async fn suggest_commands(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Vec<CommandRequest> {
        self.engine.suggest(question, history).await
    }

    #[instrument(skip(self, outputs, history), fields(model = %self.model, outputs = outputs.len()))]
    async fn analyze_outputs(
        &self,
        question: &str,
        outputs: &[CommandObservation],
        history: &[ChatMessage],
    ) -> String {
        self.engine.analyze(question, outputs, history).await
    }

    #[instrument(skip(self, outputs, history), fields(model = %self.model))]
    async fn suggest_follow_up_commands(
        &self,
        question: &str,
        outputs: &[CommandObservation],
        history: &[ChatMessage],
    ) -> Vec<CommandRequest> {
        self.engine.follow_up(question, outputs, history).await
    }

    async fn test_connection(&self) -> ConnectionTest {
        self.engine.probe("OpenRouter").await
    }
}
