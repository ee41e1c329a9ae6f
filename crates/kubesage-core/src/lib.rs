//! Kubesage Core - Turn Orchestration Engine
//!
//! This crate provides the core pipeline for Kubesage:
//! - Classify: question classification contract and keyword shim
//! - Session: per-session conversation state with exclusive turn slots
//! - Store: persistence collaborator trait and SQLite backend
//! - Outputs: phase-tagged ordered command log
//! - Orchestrator: classify → budget → suggest → execute → follow-up →
//!   analyze → persist → respond

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod error;
pub mod orchestrator;
pub mod outputs;
pub mod session;
pub mod store;

pub use classify::{Classification, KeywordClassifier, QuestionCategory, QuestionClassifier};
pub use error::{Error, Result};
pub use orchestrator::{
    AnalysisType, ChatRequest, ChatResponse, ClassificationSummary, FollowUpPolicy, Orchestrator,
    OrchestratorConfig,
};
pub use outputs::{CommandOutputs, CommandPhase, ExecutedCommand};
pub use session::{ConversationTurn, SessionCache, SessionState, TurnRole};
pub use store::{ActivityEntry, ActivityRecord, ChatStore, KubeconfigProfile, SqliteStore};
