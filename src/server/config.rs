//! Server configuration
//!
//! TOML-backed application config. Every section has serde defaults so a
//! missing file or a partial file still yields a runnable configuration.

use anyhow::{Context, Result};
use kubesage_core::OrchestratorConfig;
use kubesage_llm::LlmTimeouts;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Per-operation LLM call timeouts
    #[serde(default)]
    pub llm: LlmTimeouts,
    /// Orchestrator tuning
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path; defaults to ~/.kubesage/kubesage.db
    #[serde(default)]
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load("/definitely/not/a/config.toml").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.orchestrator.command_timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8088

            [orchestrator]
            command_timeout_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(parsed.server.port, 8088);
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert_eq!(parsed.orchestrator.command_timeout_secs, 10);
        assert_eq!(parsed.llm.probe_secs, 10);
    }
}
