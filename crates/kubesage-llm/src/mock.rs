//! Mock provider for testing
//!
//! Returns queued responses, or safe defaults when the queue is empty, and
//! records what each call received so pipeline tests can assert on it.

use crate::extract::CommandRequest;
use crate::message::ChatMessage;
use crate::observation::CommandObservation;
use crate::provider::{ConnectionTest, DiagnosticLlm, ProviderInfo};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted mock provider.
#[derive(Default)]
pub struct MockDiagnosticLlm {
    suggestions: Mutex<VecDeque<Vec<CommandRequest>>>,
    follow_ups: Mutex<VecDeque<Vec<CommandRequest>>>,
    analyses: Mutex<VecDeque<String>>,
    /// Observations passed to each analyze call, in call order
    pub analyzed: Mutex<Vec<Vec<CommandObservation>>>,
}

impl MockDiagnosticLlm {
    /// Create a mock with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a suggestion response built from raw command lines.
    pub fn push_suggestions(&self, commands: &[&str]) {
        let parsed = commands
            .iter()
            .filter_map(|c| CommandRequest::parse(c))
            .collect();
        self.suggestions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(parsed);
    }

    /// Queue a follow-up response built from raw command lines.
    pub fn push_follow_ups(&self, commands: &[&str]) {
        let parsed = commands
            .iter()
            .filter_map(|c| CommandRequest::parse(c))
            .collect();
        self.follow_ups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(parsed);
    }

    /// Queue an analysis response.
    pub fn push_analysis(&self, text: &str) {
        self.analyses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(text.to_string());
    }
}

#[async_trait::async_trait]
impl DiagnosticLlm for MockDiagnosticLlm {
    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "mock",
            model: "mock-model".to_string(),
            endpoint: "mock://".to_string(),
            supports_streaming: false,
        }
    }

    async fn suggest_commands(
        &self,
        _question: &str,
        _history: &[ChatMessage],
    ) -> Vec<CommandRequest> {
        self.suggestions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default()
    }

    async fn analyze_outputs(
        &self,
        _question: &str,
        outputs: &[CommandObservation],
        _history: &[ChatMessage],
    ) -> String {
        self.analyzed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(outputs.to_vec());
        self.analyses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| "mock analysis".to_string())
    }

    async fn suggest_follow_up_commands(
        &self,
        _question: &str,
        _outputs: &[CommandObservation],
        _history: &[ChatMessage],
    ) -> Vec<CommandRequest> {
        self.follow_ups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default()
    }

    async fn test_connection(&self) -> ConnectionTest {
        ConnectionTest {
            success: true,
            message: "mock connection successful".to_string(),
            latency_ms: Some(0),
        }
    }
}
