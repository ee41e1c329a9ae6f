//! Self-hosted provider
//!
//! Talks to an OpenAI-compatible endpoint (llama.cpp server, vLLM, Ollama
//! in compatibility mode) at `{endpoint}/v1/chat/completions`. No auth.

use crate::config::LlmTimeouts;
use crate::engine::ChatEngine;
use crate::error::Result;
use crate::extract::CommandRequest;
use crate::message::ChatMessage;
use crate::observation::CommandObservation;
use crate::provider::{ConnectionTest, DiagnosticLlm, ProviderInfo};
use crate::transport::ChatTransport;
use tracing::instrument;

/// Self-hosted local endpoint provider
pub struct LocalProvider {
    engine: ChatEngine,
    model: String,
    stream: bool,
}

impl LocalProvider {
    /// Create a provider for the given endpoint and model
    pub fn new(
        endpoint_url: &str,
        model: &str,
        stream: bool,
        timeouts: LlmTimeouts,
    ) -> Result<Self> {
        let api_url = format!("{}/v1/chat/completions", endpoint_url.trim_end_matches('/'));
        let transport = ChatTransport::new(api_url, model, stream)?;
        Ok(Self {
            engine: ChatEngine::new(transport, timeouts),
            model: model.to_string(),
            stream,
        })
    }
}

#[async_trait::async_trait]
impl DiagnosticLlm for LocalProvider {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "local",
            model: self.model.clone(),
            endpoint: self.engine.api_url().to_string(),
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
        self.engine.probe("Local LLM").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalization() {
        let provider =
            LocalProvider::new("http://localhost:8080/", "default", false, LlmTimeouts::default())
                .unwrap();
        assert_eq!(
            provider.provider_info().endpoint,
            "http://localhost:8080/v1/chat/completions"
        );
    }
}
