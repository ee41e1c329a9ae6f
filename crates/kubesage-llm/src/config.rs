//! Provider configuration types
//!
//! The active provider configuration is a runtime-swappable record looked up
//! once per turn; a fresh provider instance is built from it for every turn.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend variant to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted multi-model gateway (bearer-authenticated)
    OpenRouter,
    /// Self-hosted OpenAI-compatible endpoint
    Local,
}

impl ProviderKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Local => "local",
        }
    }

    /// Parse from the stored configuration value
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "openrouter" => Some(Self::OpenRouter),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Active LLM provider configuration, immutable for the duration of a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Backend variant
    pub provider: ProviderKind,
    /// API key (required for the hosted backend)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Endpoint URL (self-hosted backend only)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Model identifier
    pub model: String,
    /// Request server-sent-event streaming instead of one JSON document
    #[serde(default)]
    pub stream_responses: bool,
}

impl LlmProviderConfig {
    /// Hosted configuration with an API key
    #[must_use]
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::OpenRouter,
            api_key: Some(api_key.into()),
            endpoint_url: None,
            model: model.into(),
            stream_responses: false,
        }
    }

    /// Self-hosted configuration
    #[must_use]
    pub fn local(endpoint_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Local,
            api_key: None,
            endpoint_url: Some(endpoint_url.into()),
            model: model.into(),
            stream_responses: false,
        }
    }
}

/// Per-operation call timeouts
///
/// Every outbound call has an explicit bound; the values differ by call
/// weight (analysis carries far more context than a connectivity probe).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmTimeouts {
    /// Command suggestion timeout in seconds
    #[serde(default = "default_suggest_secs")]
    pub suggest_secs: u64,
    /// Follow-up suggestion timeout in seconds
    #[serde(default = "default_follow_up_secs")]
    pub follow_up_secs: u64,
    /// Output analysis timeout in seconds
    #[serde(default = "default_analyze_secs")]
    pub analyze_secs: u64,
    /// Connectivity probe timeout in seconds
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,
}

fn default_suggest_secs() -> u64 {
    15
}
fn default_follow_up_secs() -> u64 {
    20
}
fn default_analyze_secs() -> u64 {
    120
}
fn default_probe_secs() -> u64 {
    10
}

impl Default for LlmTimeouts {
    fn default() -> Self {
        Self {
            suggest_secs: default_suggest_secs(),
            follow_up_secs: default_follow_up_secs(),
            analyze_secs: default_analyze_secs(),
            probe_secs: default_probe_secs(),
        }
    }
}

impl LlmTimeouts {
    /// Suggestion timeout as a [`Duration`]
    #[must_use]
    pub fn suggest(&self) -> Duration {
        Duration::from_secs(self.suggest_secs)
    }

    /// Follow-up timeout as a [`Duration`]
    #[must_use]
    pub fn follow_up(&self) -> Duration {
        Duration::from_secs(self.follow_up_secs)
    }

    /// Analysis timeout as a [`Duration`]
    #[must_use]
    pub fn analyze(&self) -> Duration {
        Duration::from_secs(self.analyze_secs)
    }

    /// Probe timeout as a [`Duration`]
    #[must_use]
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trip() {
        assert_eq!(ProviderKind::parse("openrouter"), Some(ProviderKind::OpenRouter));
        assert_eq!(ProviderKind::parse("Local"), Some(ProviderKind::Local));
        assert_eq!(ProviderKind::parse("bedrock"), None);
        assert_eq!(ProviderKind::OpenRouter.as_str(), "openrouter");
    }

    #[test]
    fn test_timeout_defaults() {
        let timeouts = LlmTimeouts::default();
        assert_eq!(timeouts.probe_secs, 10);
        assert!(timeouts.analyze_secs > timeouts.suggest_secs);
        assert_eq!(timeouts.probe(), Duration::from_secs(10));
    }
}
