//! Kubesage LLM - Provider Abstraction
//!
//! This crate provides the LLM integration for Kubesage:
//! - Provider: the diagnostic capability trait and per-turn factory
//! - OpenRouter: hosted multi-model gateway (bearer auth)
//! - Local: self-hosted OpenAI-compatible endpoint
//! - Transport: shared chat-completions client with SSE stream decoding
//! - Prompts / Extract / Fallback: shared prompt construction, command
//!   extraction, and deterministic degradation shared by both variants

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod engine;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod local;
pub mod message;
pub mod mock;
pub mod observation;
pub mod openrouter;
pub mod prompts;
pub mod provider;
pub mod transport;

pub use config::{LlmProviderConfig, LlmTimeouts, ProviderKind};
pub use error::{Error, Result};
pub use extract::{extract_commands, CommandRequest};
pub use fallback::{fallback_response, FallbackKind};
pub use local::LocalProvider;
pub use message::{ChatMessage, ChatRole};
pub use mock::MockDiagnosticLlm;
pub use observation::CommandObservation;
pub use openrouter::OpenRouterProvider;
pub use provider::{
    ClientFactory, ConnectionTest, DiagnosticLlm, ProviderFactory, ProviderInfo,
    MAX_FOLLOW_UP_COMMANDS, MAX_SUGGESTED_COMMANDS,
};
