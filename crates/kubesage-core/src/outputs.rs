//! Phase-tagged command output log
//!
//! Results accumulate in execution order, tagged with the round that
//! produced them. A command repeated across the primary and follow-up
//! phases appends a second entry — nothing is ever overwritten, so the log
//! is a faithful audit of the turn.

use kubesage_llm::CommandObservation;
use kubesage_tools::CommandResult;
use serde::Serialize;

/// Which round executed a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandPhase {
    /// First suggestion round
    Primary,
    /// Deeper second round
    FollowUp,
}

impl CommandPhase {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::FollowUp => "follow_up",
        }
    }
}

/// One executed command with its result
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedCommand {
    /// Execution round
    pub phase: CommandPhase,
    /// The suggested command string (not the expanded invocation)
    pub command: String,
    /// Execution outcome
    pub result: CommandResult,
}

/// Ordered log of a turn's executed commands
#[derive(Debug, Default)]
pub struct CommandOutputs {
    entries: Vec<ExecutedCommand>,
}

impl CommandOutputs {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one result
    pub fn push(&mut self, phase: CommandPhase, command: impl Into<String>, result: CommandResult) {
        self.entries.push(ExecutedCommand {
            phase,
            command: command.into(),
            result,
        });
    }

    /// Whether nothing has executed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of executed commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All entries in execution order
    #[must_use]
    pub fn entries(&self) -> &[ExecutedCommand] {
        &self.entries
    }

    /// Command strings in execution order
    #[must_use]
    pub fn commands_executed(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.command.clone()).collect()
    }

    /// Flattened view for provider calls
    #[must_use]
    pub fn observations(&self) -> Vec<CommandObservation> {
        self.entries
            .iter()
            .map(|e| CommandObservation {
                command: e.command.clone(),
                success: e.result.success,
                stdout: e.result.stdout.clone(),
                stderr: e.result.stderr.clone(),
                error: e.result.error.clone(),
                tool_available: e.result.tool_available,
                target_reachable: e.result.target_reachable,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(command: &str, success: bool) -> CommandResult {
        CommandResult {
            command: command.to_string(),
            success,
            stdout: "out".to_string(),
            stderr: String::new(),
            exit_code: i32::from(!success),
            tool_available: true,
            target_reachable: true,
            timestamp: Utc::now(),
            error: None,
        }
    }

    #[test]
    fn test_preserves_execution_order() {
        let mut outputs = CommandOutputs::new();
        outputs.push(CommandPhase::Primary, "kubectl get pods", result("kubectl get pods", true));
        outputs.push(CommandPhase::Primary, "kubectl get nodes", result("kubectl get nodes", true));
        outputs.push(CommandPhase::FollowUp, "kubectl describe pod web-0", result("kubectl describe pod web-0", true));

        assert_eq!(
            outputs.commands_executed(),
            vec!["kubectl get pods", "kubectl get nodes", "kubectl describe pod web-0"]
        );
        assert_eq!(outputs.entries()[2].phase, CommandPhase::FollowUp);
    }

    #[test]
    fn test_duplicate_command_across_phases_keeps_both() {
        let mut outputs = CommandOutputs::new();
        outputs.push(CommandPhase::Primary, "kubectl get pods", result("kubectl get pods", false));
        outputs.push(CommandPhase::FollowUp, "kubectl get pods", result("kubectl get pods", true));

        assert_eq!(outputs.len(), 2);
        assert!(!outputs.entries()[0].result.success);
        assert!(outputs.entries()[1].result.success);
    }

    #[test]
    fn test_observations_flatten_results() {
        let mut outputs = CommandOutputs::new();
        let mut failed = result("kubectl get pods", false);
        failed.error = Some("timed out after 30s".to_string());
        outputs.push(CommandPhase::Primary, "kubectl get pods", failed);

        let observations = outputs.observations();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].error.as_deref(), Some("timed out after 30s"));
        assert!(observations[0].tool_available);
    }
}
