//! Conversation state
//!
//! One [`SessionState`] per session id holds the ordered turn history. The
//! [`SessionCache`] hands out one mutex-guarded slot per session: a turn
//! locks its slot before reading the history and releases it only after the
//! turn is persisted, so concurrent requests for the same session can never
//! interleave or duplicate turns. Turns for different sessions share
//! nothing and never block one another.

use crate::classify::Classification;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kubesage_llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The user asked something
    User,
    /// The assistant answered
    Assistant,
}

impl TurnRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse from the stored representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One user or assistant turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Sender role
    pub role: TurnRole,
    /// Message text
    pub message: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
    /// Commands executed while producing this turn (assistant turns only)
    pub commands_executed: Vec<String>,
    /// Classification snapshot (assistant turns only)
    pub classification: Option<Classification>,
}

impl ConversationTurn {
    /// A user turn
    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            message: message.into(),
            timestamp: Utc::now(),
            commands_executed: Vec::new(),
            classification: None,
        }
    }

    /// An assistant turn with its execution record
    #[must_use]
    pub fn assistant(
        message: impl Into<String>,
        commands_executed: Vec<String>,
        classification: Option<Classification>,
    ) -> Self {
        Self {
            role: TurnRole::Assistant,
            message: message.into(),
            timestamp: Utc::now(),
            commands_executed,
            classification,
        }
    }
}

/// In-memory state for one session
#[derive(Debug, Default)]
pub struct SessionState {
    /// Session identifier
    pub session_id: String,
    turns: Vec<ConversationTurn>,
    hydrated: bool,
}

impl SessionState {
    /// Create empty state for a session id
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            hydrated: false,
        }
    }

    /// Whether durable history has been loaded into this state
    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Install turns loaded from durable storage
    pub fn hydrate(&mut self, turns: Vec<ConversationTurn>) {
        debug!(session_id = %self.session_id, turns = turns.len(), "Session hydrated from storage");
        self.turns = turns;
        self.hydrated = true;
    }

    /// Append a turn
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// The ordered turn history
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// History as chat messages for provider calls
    #[must_use]
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|turn| match turn.role {
                TurnRole::User => ChatMessage::user(&turn.message),
                TurnRole::Assistant => ChatMessage::assistant(&turn.message),
            })
            .collect()
    }
}

/// Per-session slots guarding all turn processing
#[derive(Default)]
pub struct SessionCache {
    slots: DashMap<String, Arc<Mutex<SessionState>>>,
}

impl SessionCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the slot for a session.
    ///
    /// The returned mutex is the session's serialization point: hold it for
    /// the whole turn, from first read through persistence.
    #[must_use]
    pub fn slot(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        self.slots
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(session_id))))
            .clone()
    }

    /// Drop a session's in-memory state (logout, history deletion).
    pub fn remove(&self, session_id: &str) -> bool {
        self.slots.remove(session_id).is_some()
    }

    /// Number of cached sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_session_shares_slot() {
        let cache = SessionCache::new();
        let a = cache.slot("s1");
        let b = cache.slot("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_different_sessions_do_not_share() {
        let cache = SessionCache::new();
        let a = cache.slot("s1");
        let b = cache.slot("s2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_slot_serializes_access() {
        let cache = SessionCache::new();
        let slot = cache.slot("s1");

        let guard = slot.lock().await;
        // A second turn for the same session must wait.
        assert!(slot.try_lock().is_err());
        drop(guard);
        assert!(slot.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_block() {
        let cache = SessionCache::new();
        let s1 = cache.slot("s1");
        let s2 = cache.slot("s2");

        let _guard = s1.lock().await;
        assert!(s2.try_lock().is_ok());
    }

    #[test]
    fn test_remove_evicts_state() {
        let cache = SessionCache::new();
        cache.slot("s1");
        assert!(cache.remove("s1"));
        assert!(!cache.remove("s1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hydrate_once() {
        let mut state = SessionState::new("s1");
        assert!(!state.is_hydrated());
        state.hydrate(vec![ConversationTurn::user("hello")]);
        assert!(state.is_hydrated());
        assert_eq!(state.turns().len(), 1);
    }

    #[test]
    fn test_chat_messages_map_roles() {
        let mut state = SessionState::new("s1");
        state.push(ConversationTurn::user("q"));
        state.push(ConversationTurn::assistant("a", vec!["kubectl get pods".into()], None));

        let messages = state.chat_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, kubesage_llm::ChatRole::User);
        assert_eq!(messages[1].role, kubesage_llm::ChatRole::Assistant);
    }
}
