//! Persistence collaborator
//!
//! The orchestrator consumes durable storage through the [`ChatStore`]
//! trait: turn history, the runtime-swappable active LLM and kubeconfig
//! records, and the activity log. [`SqliteStore`] is the default backend —
//! an embedded database with WAL journaling and bootstrap-on-open schema.

use crate::classify::Classification;
use crate::error::{Error, Result};
use crate::session::{ConversationTurn, TurnRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kubesage_llm::{LlmProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// A named kubeconfig profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubeconfigProfile {
    /// Display name
    pub name: String,
    /// Path to the kubeconfig file
    pub path: String,
}

/// One activity log entry to record
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    /// Acting user
    pub user_id: String,
    /// Action type ("command_executed", "command_rejected", ...)
    pub action: String,
    /// Command involved, if any
    pub command: Option<String>,
    /// Classification category active for the turn
    pub classification: Option<String>,
    /// Whether the action succeeded
    pub success: bool,
    /// Failure detail
    pub detail: Option<String>,
}

/// A stored activity log entry
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    /// Row id
    pub id: i64,
    /// Acting user
    pub user_id: String,
    /// Action type
    pub action: String,
    /// Command involved, if any
    pub command: Option<String>,
    /// Classification category
    pub classification: Option<String>,
    /// Whether the action succeeded
    pub success: bool,
    /// Failure detail
    pub detail: Option<String>,
    /// When the entry was recorded
    pub created_at: DateTime<Utc>,
}

/// Durable storage consumed by the orchestrator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Append one turn to a session's history.
    async fn save_turn(&self, session_id: &str, user_id: &str, turn: &ConversationTurn)
        -> Result<()>;

    /// Load a session's history in insertion order, up to `limit` turns.
    async fn load_turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>>;

    /// Delete a session's history. Returns whether anything was deleted.
    async fn delete_history(&self, session_id: &str) -> Result<bool>;

    /// The currently active LLM configuration, if one is set.
    async fn get_active_llm_config(&self) -> Result<Option<LlmProviderConfig>>;

    /// Store a configuration and make it the active one.
    async fn set_active_llm_config(&self, config: &LlmProviderConfig) -> Result<i64>;

    /// The currently active kubeconfig profile, if one is set.
    async fn get_active_kubeconfig(&self) -> Result<Option<KubeconfigProfile>>;

    /// Store a kubeconfig profile and make it the active one.
    async fn set_active_kubeconfig(&self, profile: &KubeconfigProfile) -> Result<i64>;

    /// Record one activity log entry.
    async fn log_activity(&self, record: &ActivityRecord) -> Result<()>;

    /// Most recent activity entries, newest first.
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>>;

    /// Verify the backend answers queries.
    async fn health_check(&self) -> Result<()>;
}

/// SQLite-backed store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (and bootstrap) a store at the given path.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Persistence(format!("invalid sqlite path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Persistence(format!("failed to connect to sqlite: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    /// Open a store at the default location (~/.kubesage/kubesage.db).
    pub async fn new_default() -> Result<Self> {
        Self::new(Self::default_path()?).await
    }

    /// The default database path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Persistence("could not determine home directory".to_string()))?;
        Ok(home.join(".kubesage").join("kubesage.db"))
    }

    async fn init_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                message TEXT NOT NULL,
                commands_executed TEXT NOT NULL DEFAULT '[]',
                classification TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_session ON chat_messages(session_id, id)",
            r#"
            CREATE TABLE IF NOT EXISTS llm_configs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider TEXT NOT NULL,
                api_key TEXT,
                endpoint_url TEXT,
                model TEXT NOT NULL,
                stream_responses INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS kubeconfigs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                path TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                action TEXT NOT NULL,
                command TEXT,
                classification TEXT,
                success INTEGER NOT NULL,
                detail TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Persistence(format!("schema init failed: {}", e)))?;
        }

        debug!("SQLite schema initialized");
        Ok(())
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn save_turn(
        &self,
        session_id: &str,
        user_id: &str,
        turn: &ConversationTurn,
    ) -> Result<()> {
        let commands = serde_json::to_string(&turn.commands_executed)
            .map_err(|e| Error::Persistence(format!("failed to serialize commands: {}", e)))?;
        let classification = turn
            .classification
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Persistence(format!("failed to serialize classification: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages
                (session_id, user_id, role, message, commands_executed, classification, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(turn.role.as_str())
        .bind(&turn.message)
        .bind(&commands)
        .bind(&classification)
        .bind(turn.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("failed to save turn: {}", e)))?;

        debug!(session_id = %session_id, role = %turn.role.as_str(), "Turn saved");
        Ok(())
    }

    async fn load_turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let rows: Vec<(String, String, String, Option<String>, String)> = sqlx::query_as(
            r#"
            SELECT role, message, commands_executed, classification, created_at
            FROM chat_messages
            WHERE session_id = ?
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("failed to load turns: {}", e)))?;

        let mut turns = Vec::with_capacity(rows.len());
        for (role, message, commands, classification, created_at) in rows {
            let role = TurnRole::parse(&role)
                .ok_or_else(|| Error::Persistence(format!("unknown turn role '{}'", role)))?;
            let commands_executed: Vec<String> = serde_json::from_str(&commands)
                .map_err(|e| Error::Persistence(format!("corrupt command list: {}", e)))?;
            let classification: Option<Classification> = classification
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| Error::Persistence(format!("corrupt classification: {}", e)))?;
            let timestamp = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Persistence(format!("corrupt timestamp: {}", e)))?
                .with_timezone(&Utc);

            turns.push(ConversationTurn {
                role,
                message,
                timestamp,
                commands_executed,
                classification,
            });
        }

        debug!(session_id = %session_id, turns = turns.len(), "Turns loaded");
        Ok(turns)
    }

    async fn delete_history(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("failed to delete history: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_active_llm_config(&self) -> Result<Option<LlmProviderConfig>> {
        let row: Option<(String, Option<String>, Option<String>, String, bool)> = sqlx::query_as(
            r#"
            SELECT provider, api_key, endpoint_url, model, stream_responses
            FROM llm_configs
            WHERE is_active = 1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("failed to load llm config: {}", e)))?;

        match row {
            Some((provider, api_key, endpoint_url, model, stream_responses)) => {
                let provider = ProviderKind::parse(&provider).ok_or_else(|| {
                    Error::Persistence(format!("unknown provider '{}' in llm_configs", provider))
                })?;
                Ok(Some(LlmProviderConfig {
                    provider,
                    api_key,
                    endpoint_url,
                    model,
                    stream_responses,
                }))
            }
            None => Ok(None),
        }
    }

    async fn set_active_llm_config(&self, config: &LlmProviderConfig) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Persistence(format!("failed to open transaction: {}", e)))?;

        sqlx::query("UPDATE llm_configs SET is_active = 0")
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Persistence(format!("failed to deactivate configs: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO llm_configs
                (provider, api_key, endpoint_url, model, stream_responses, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(config.provider.as_str())
        .bind(&config.api_key)
        .bind(&config.endpoint_url)
        .bind(&config.model)
        .bind(config.stream_responses)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Persistence(format!("failed to save llm config: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Persistence(format!("failed to commit llm config: {}", e)))?;

        info!(provider = %config.provider.as_str(), model = %config.model, "Active LLM config changed");
        Ok(result.last_insert_rowid())
    }

    async fn get_active_kubeconfig(&self) -> Result<Option<KubeconfigProfile>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT name, path FROM kubeconfigs WHERE is_active = 1 ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("failed to load kubeconfig: {}", e)))?;

        Ok(row.map(|(name, path)| KubeconfigProfile { name, path }))
    }

    async fn set_active_kubeconfig(&self, profile: &KubeconfigProfile) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Persistence(format!("failed to open transaction: {}", e)))?;

        sqlx::query("UPDATE kubeconfigs SET is_active = 0")
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Persistence(format!("failed to deactivate kubeconfigs: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO kubeconfigs (name, path, is_active, created_at) VALUES (?, ?, 1, ?)",
        )
        .bind(&profile.name)
        .bind(&profile.path)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Persistence(format!("failed to save kubeconfig: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Persistence(format!("failed to commit kubeconfig: {}", e)))?;

        info!(name = %profile.name, path = %profile.path, "Active kubeconfig changed");
        Ok(result.last_insert_rowid())
    }

    async fn log_activity(&self, record: &ActivityRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log
                (user_id, action, command, classification, success, detail, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.action)
        .bind(&record.command)
        .bind(&record.classification)
        .bind(record.success)
        .bind(&record.detail)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("failed to log activity: {}", e)))?;

        Ok(())
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let rows: Vec<(
            i64,
            String,
            String,
            Option<String>,
            Option<String>,
            bool,
            Option<String>,
            String,
        )> = sqlx::query_as(
            r#"
            SELECT id, user_id, action, command, classification, success, detail, created_at
            FROM activity_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("failed to load activity: {}", e)))?;

        let mut entries = Vec::with_capacity(rows.len());
        for (id, user_id, action, command, classification, success, detail, created_at) in rows {
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Persistence(format!("corrupt timestamp: {}", e)))?
                .with_timezone(&Utc);
            entries.push(ActivityEntry {
                id,
                user_id,
                action,
                command,
                classification,
                success,
                detail,
                created_at,
            });
        }
        Ok(entries)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Persistence(format!("health check failed: {}", e)))?;
        Ok(())
    }
}
