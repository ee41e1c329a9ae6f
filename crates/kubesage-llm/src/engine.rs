//! Shared capability implementations
//!
//! Both backend variants delegate their method bodies here; only transport
//! construction differs between them. This is where failures turn into
//! fallback data instead of errors.

use crate::config::LlmTimeouts;
use crate::extract::{extract_commands, CommandRequest};
use crate::fallback::{fallback_response, FallbackKind};
use crate::message::ChatMessage;
use crate::observation::CommandObservation;
use crate::prompts;
use crate::provider::{ConnectionTest, MAX_FOLLOW_UP_COMMANDS, MAX_SUGGESTED_COMMANDS};
use crate::transport::ChatTransport;
use std::time::Instant;
use tracing::warn;

const SUGGEST_MAX_TOKENS: u32 = 500;
const SUGGEST_TEMPERATURE: f32 = 0.3;
const FOLLOW_UP_MAX_TOKENS: u32 = 500;
const FOLLOW_UP_TEMPERATURE: f32 = 0.5;
const ANALYZE_MAX_TOKENS: u32 = 1500;
const ANALYZE_TEMPERATURE: f32 = 0.7;
const PROBE_MAX_TOKENS: u32 = 10;
const PROBE_TEMPERATURE: f32 = 0.1;

pub(crate) struct ChatEngine {
    transport: ChatTransport,
    timeouts: LlmTimeouts,
}

impl ChatEngine {
    pub(crate) fn new(transport: ChatTransport, timeouts: LlmTimeouts) -> Self {
        Self { transport, timeouts }
    }

    pub(crate) fn api_url(&self) -> &str {
        self.transport.api_url()
    }

    pub(crate) async fn suggest(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Vec<CommandRequest> {
        let messages = prompts::suggestion_messages(question, history);
        match self
            .transport
            .chat(&messages, SUGGEST_MAX_TOKENS, SUGGEST_TEMPERATURE, self.timeouts.suggest())
            .await
        {
            Ok(content) => extract_commands(&content, MAX_SUGGESTED_COMMANDS),
            Err(e) => {
                warn!(error = %e, "Command suggestion failed, continuing without commands");
                Vec::new()
            }
        }
    }

    pub(crate) async fn analyze(
        &self,
        question: &str,
        outputs: &[CommandObservation],
        history: &[ChatMessage],
    ) -> String {
        let messages = prompts::analysis_messages(question, outputs, history);
        match self
            .transport
            .chat(&messages, ANALYZE_MAX_TOKENS, ANALYZE_TEMPERATURE, self.timeouts.analyze())
            .await
        {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Analysis call failed, returning fallback response");
                let kind = if outputs.is_empty() {
                    FallbackKind::for_question(question)
                } else {
                    FallbackKind::Analysis
                };
                fallback_response(kind).to_string()
            }
        }
    }

    pub(crate) async fn follow_up(
        &self,
        question: &str,
        outputs: &[CommandObservation],
        history: &[ChatMessage],
    ) -> Vec<CommandRequest> {
        let messages = prompts::follow_up_messages(question, outputs, history);
        match self
            .transport
            .chat(
                &messages,
                FOLLOW_UP_MAX_TOKENS,
                FOLLOW_UP_TEMPERATURE,
                self.timeouts.follow_up(),
            )
            .await
        {
            Ok(content) => extract_commands(&content, MAX_FOLLOW_UP_COMMANDS),
            Err(e) => {
                warn!(error = %e, "Follow-up suggestion failed, skipping follow-up round");
                Vec::new()
            }
        }
    }

    pub(crate) async fn probe(&self, provider: &str) -> ConnectionTest {
        let messages = vec![ChatMessage::user("test")];
        let started = Instant::now();
        match self
            .transport
            .chat(&messages, PROBE_MAX_TOKENS, PROBE_TEMPERATURE, self.timeouts.probe())
            .await
        {
            Ok(_) => ConnectionTest {
                success: true,
                message: format!("{} connection successful", provider),
                latency_ms: Some(started.elapsed().as_millis() as u64),
            },
            Err(e) => ConnectionTest {
                success: false,
                message: format!("{} connection failed: {}", provider, e),
                latency_ms: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::{fallback_response, FallbackKind};
    use crate::observation::CommandObservation;

    /// Engine pointed at a port nothing listens on: every call fails fast
    /// with a connection error and must degrade, never propagate.
    fn unreachable_engine() -> ChatEngine {
        let transport =
            ChatTransport::new("http://127.0.0.1:1/v1/chat/completions", "test-model", false)
                .unwrap();
        ChatEngine::new(transport, LlmTimeouts::default())
    }

    #[tokio::test]
    async fn test_suggest_degrades_to_empty_list() {
        let engine = unreachable_engine();
        assert!(engine.suggest("why is my pod failing?", &[]).await.is_empty());
        assert!(engine.follow_up("q", &[], &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_degrades_to_operation_fallback() {
        let engine = unreachable_engine();

        // With collected data: the analysis fallback.
        let outputs = vec![CommandObservation::ok("kubectl get pods", "NAME READY")];
        let response = engine.analyze("what is wrong?", &outputs, &[]).await;
        assert_eq!(response, fallback_response(FallbackKind::Analysis));

        // Without data: flavored by the question.
        let response = engine.analyze("is my cluster healthy?", &[], &[]).await;
        assert_eq!(response, fallback_response(FallbackKind::ClusterHealth));
    }

    #[tokio::test]
    async fn test_probe_reports_failure() {
        let engine = unreachable_engine();
        let test = engine.probe("Local LLM").await;
        assert!(!test.success);
        assert!(test.message.contains("Local LLM connection failed"));
        assert!(test.latency_ms.is_none());
    }
}
