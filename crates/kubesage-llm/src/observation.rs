//! Executor-independent view of a command outcome
//!
//! The provider layer must not depend on the execution layer, so the
//! orchestrator hands analysis and follow-up calls this flattened view of
//! each executed command instead of the executor's own result type.

use serde::{Deserialize, Serialize};

/// One executed diagnostic command as seen by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandObservation {
    /// Full command line as executed
    pub command: String,
    /// Whether the command exited successfully
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Error detail for timeouts and spawn failures
    pub error: Option<String>,
    /// False when the kubectl binary was missing
    pub tool_available: bool,
    /// False when the cluster could not be reached
    pub target_reachable: bool,
}

impl CommandObservation {
    /// Successful observation with the given stdout (primarily for tests)
    #[must_use]
    pub fn ok(command: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            error: None,
            tool_available: true,
            target_reachable: true,
        }
    }
}
