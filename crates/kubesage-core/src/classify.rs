//! Question classification contract
//!
//! The real classifier is an external collaborator; this module owns its
//! input/output contract and ships a deterministic keyword heuristic as the
//! in-repo implementation. The contract guarantee is that classification
//! always returns a value — a degraded result is just the heuristic one,
//! surfaced through the `method` field.

use crate::session::ConversationTurn;
use kubesage_llm::DiagnosticLlm;
use serde::{Deserialize, Serialize};

/// Question category driving investigation depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    /// Small talk, thanks, generic how-to questions
    Conversational,
    /// Direct listing/lookup of a named resource
    SimpleLookup,
    /// Something looks wrong and needs a bounded look
    ModerateInvestigation,
    /// Root-cause hunting across resources
    DeepAnalysis,
}

impl QuestionCategory {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversational => "conversational",
            Self::SimpleLookup => "simple_lookup",
            Self::ModerateInvestigation => "moderate_investigation",
            Self::DeepAnalysis => "deep_analysis",
        }
    }
}

/// Result of classifying one user question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Question category
    pub category: QuestionCategory,
    /// Complexity in [0, 1]
    pub complexity_score: f32,
    /// Classifier confidence in [0, 1]
    pub confidence: f32,
    /// How the classification was produced ("heuristic", "llm", ...)
    pub method: String,
    /// Upper bound on diagnostic commands for this turn
    pub suggested_max_commands: usize,
    /// Whether a follow-up round may run
    pub follow_up_allowed: bool,
    /// Human-readable rationale
    pub reasoning: String,
}

/// Classification service contract.
///
/// Implementations must always return a value; internal failures fall back
/// to a deterministic result rather than failing the turn.
#[async_trait::async_trait]
pub trait QuestionClassifier: Send + Sync {
    /// Classify one user message in the context of its conversation.
    async fn classify(
        &self,
        message: &str,
        history: &[ConversationTurn],
        llm: &dyn DiagnosticLlm,
    ) -> Classification;
}

const DEEP_MARKERS: &[&str] = &[
    "why",
    "investigate",
    "troubleshoot",
    "root cause",
    "diagnose",
    "debug",
    "failing",
    "crash",
    "keeps restarting",
];

const MODERATE_MARKERS: &[&str] = &[
    "wrong",
    "issue",
    "problem",
    "error",
    "not working",
    "broken",
    "slow",
    "unhealthy",
    "stuck",
    "pending",
];

const RESOURCE_MARKERS: &[&str] = &[
    "pod",
    "deployment",
    "service",
    "node",
    "namespace",
    "ingress",
    "event",
    "log",
    "cluster",
    "replica",
    "pvc",
    "configmap",
];

fn matched<'a>(message: &str, markers: &[&'a str]) -> Vec<&'a str> {
    markers.iter().copied().filter(|m| message.contains(m)).collect()
}

/// Deterministic keyword-based classifier.
///
/// Stands in for the external classifier component. It accepts the LLM
/// handle the contract requires but never calls it, so identical inputs
/// always produce identical classifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Create a keyword classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn classify_message(message: &str) -> Classification {
        let lower = message.to_lowercase();
        let deep = matched(&lower, DEEP_MARKERS);
        let moderate = matched(&lower, MODERATE_MARKERS);
        let resources = matched(&lower, RESOURCE_MARKERS);

        let (category, complexity_score, confidence, reasoning) = if !deep.is_empty() {
            (
                QuestionCategory::DeepAnalysis,
                (0.6 + 0.1 * deep.len() as f32).min(0.95),
                0.8,
                format!("investigation markers: {}", deep.join(", ")),
            )
        } else if !moderate.is_empty() {
            (
                QuestionCategory::ModerateInvestigation,
                (0.4 + 0.1 * moderate.len() as f32).min(0.7),
                0.7,
                format!("problem markers: {}", moderate.join(", ")),
            )
        } else if !resources.is_empty() {
            (
                QuestionCategory::SimpleLookup,
                0.2,
                0.9,
                format!("resource lookup: {}", resources.join(", ")),
            )
        } else {
            (
                QuestionCategory::Conversational,
                0.05,
                0.9,
                "no cluster resources mentioned".to_string(),
            )
        };

        let suggested_max_commands = match category {
            QuestionCategory::Conversational => 0,
            QuestionCategory::SimpleLookup => 1,
            QuestionCategory::ModerateInvestigation => 2,
            QuestionCategory::DeepAnalysis => 3,
        };

        Classification {
            category,
            complexity_score,
            confidence,
            method: "heuristic".to_string(),
            suggested_max_commands,
            follow_up_allowed: matches!(
                category,
                QuestionCategory::ModerateInvestigation | QuestionCategory::DeepAnalysis
            ),
            reasoning,
        }
    }
}

#[async_trait::async_trait]
impl QuestionClassifier for KeywordClassifier {
    async fn classify(
        &self,
        message: &str,
        _history: &[ConversationTurn],
        _llm: &dyn DiagnosticLlm,
    ) -> Classification {
        Self::classify_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubesage_llm::MockDiagnosticLlm;

    async fn classify(message: &str) -> Classification {
        KeywordClassifier::new()
            .classify(message, &[], &MockDiagnosticLlm::new())
            .await
    }

    #[tokio::test]
    async fn test_deep_analysis() {
        let c = classify("why is my nginx pod failing?").await;
        assert_eq!(c.category, QuestionCategory::DeepAnalysis);
        assert_eq!(c.suggested_max_commands, 3);
        assert!(c.follow_up_allowed);
        assert!(c.complexity_score > 0.6);
    }

    #[tokio::test]
    async fn test_moderate_investigation() {
        let c = classify("there is an issue with the payments service").await;
        assert_eq!(c.category, QuestionCategory::ModerateInvestigation);
        assert_eq!(c.suggested_max_commands, 2);
        assert!(c.follow_up_allowed);
    }

    #[tokio::test]
    async fn test_simple_lookup() {
        let c = classify("show me the pods in the default namespace").await;
        assert_eq!(c.category, QuestionCategory::SimpleLookup);
        assert_eq!(c.suggested_max_commands, 1);
        assert!(!c.follow_up_allowed);
    }

    #[tokio::test]
    async fn test_conversational() {
        let c = classify("thanks, that was helpful!").await;
        assert_eq!(c.category, QuestionCategory::Conversational);
        assert_eq!(c.suggested_max_commands, 0);
        assert!(!c.follow_up_allowed);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let a = classify("why does my deployment keep crashing?").await;
        let b = classify("why does my deployment keep crashing?").await;
        assert_eq!(a.category, b.category);
        assert_eq!(a.complexity_score, b.complexity_score);
        assert_eq!(a.reasoning, b.reasoning);
        assert_eq!(a.method, "heuristic");
    }

    #[tokio::test]
    async fn test_scores_stay_in_range() {
        for message in [
            "why why why investigate troubleshoot debug diagnose failing crash",
            "hello",
            "pods",
        ] {
            let c = classify(message).await;
            assert!((0.0..=1.0).contains(&c.complexity_score));
            assert!((0.0..=1.0).contains(&c.confidence));
        }
    }
}
