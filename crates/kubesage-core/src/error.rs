//! Error types for kubesage-core
//!
//! Almost everything that can go wrong inside a turn is recovered locally
//! and becomes data fed into the analysis step. The variants here are the
//! few conditions that legitimately fail a turn: broken persistence, broken
//! configuration, and a provider that cannot even be constructed.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Durable storage failed
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Invalid or missing runtime configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// LLM provider construction failed
    #[error("llm error: {0}")]
    Llm(#[from] kubesage_llm::Error),

    /// Unexpected internal fault
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the operator must finish setup
    /// (no active LLM configuration, bad provider settings).
    #[must_use]
    pub fn requires_setup(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Llm(kubesage_llm::Error::NotConfigured(_))
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
