//! Diagnostic command executor
//!
//! Runs one validated kubectl invocation against the live cluster and
//! always hands back a [`CommandResult`] — a missing binary, an unreachable
//! cluster, a timeout, and an ordinary non-zero exit are all data, never
//! errors, so the calling pipeline is uninterrupted. Triage order matters:
//! a missing tool and an unreachable cluster need different remediation and
//! must stay distinguishable.

use crate::parse::{parse_ls_output, PodFileEntry};
use crate::safety::{validate_args, verify_path_safety};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// stderr fragments that indicate the cluster cannot be reached with the
/// active configuration
pub const CONNECTION_ERROR_PATTERNS: &[&str] = &[
    "unable to connect",
    "connection refused",
    "was refused",
    "no configuration",
    "invalid configuration",
];

const TOOL_MISSING_ERROR: &str =
    "kubectl not found - please install kubectl or ensure it's in PATH";

/// Uniform result of one command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Full command line as executed
    pub command: String,
    /// Whether the command exited with status 0
    pub success: bool,
    /// Captured stdout, verbatim
    pub stdout: String,
    /// Captured stderr, verbatim
    pub stderr: String,
    /// Process exit code (-1 when the process never ran or was killed)
    pub exit_code: i32,
    /// False when the kubectl binary is missing
    pub tool_available: bool,
    /// False when the cluster is not reachable
    pub target_reachable: bool,
    /// When the command finished
    pub timestamp: DateTime<Utc>,
    /// Error detail (timeouts, rejections, spawn failures)
    pub error: Option<String>,
}

impl CommandResult {
    fn failed(command: String, error: String) -> Self {
        Self {
            command,
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            tool_available: true,
            target_reachable: true,
            timestamp: Utc::now(),
            error: Some(error),
        }
    }

    fn tool_missing(command: String) -> Self {
        Self {
            tool_available: false,
            ..Self::failed(command, TOOL_MISSING_ERROR.to_string())
        }
    }
}

/// Classify a finished process into a [`CommandResult`].
///
/// Priority order: missing tool, unreachable cluster, plain exit status.
fn triage(command: String, exit_code: i32, stdout: String, stderr: String) -> CommandResult {
    let stderr_lower = stderr.to_lowercase();

    if exit_code != 0 && stderr_lower.contains("command not found") {
        return CommandResult {
            stderr,
            exit_code,
            ..CommandResult::tool_missing(command)
        };
    }

    if exit_code != 0
        && CONNECTION_ERROR_PATTERNS
            .iter()
            .any(|p| stderr_lower.contains(p))
    {
        return CommandResult {
            command,
            success: false,
            stdout: String::new(),
            stderr: stderr.clone(),
            exit_code,
            tool_available: true,
            target_reachable: false,
            timestamp: Utc::now(),
            error: Some(format!("Cluster connection error: {}", stderr.trim())),
        };
    }

    CommandResult {
        command,
        success: exit_code == 0,
        stdout,
        stderr,
        exit_code,
        tool_available: true,
        target_reachable: true,
        timestamp: Utc::now(),
        error: None,
    }
}

/// File content read from inside a pod
#[derive(Debug, Clone, Serialize)]
pub struct PodFileContent {
    /// Whether the read succeeded
    pub success: bool,
    /// File content (empty on failure)
    pub content: String,
    /// Failure detail
    pub error: Option<String>,
}

/// Directory listing read from inside a pod
#[derive(Debug, Clone, Serialize)]
pub struct PodDirListing {
    /// Whether the listing succeeded
    pub success: bool,
    /// The listed path
    pub path: String,
    /// Parsed entries (empty on failure)
    pub files: Vec<PodFileEntry>,
    /// Failure detail
    pub error: Option<String>,
}

/// Executor for read-only kubectl commands
#[derive(Debug, Clone)]
pub struct KubectlExecutor {
    binary: String,
    kubeconfig_path: Option<PathBuf>,
    command_timeout: Duration,
    probe_timeout: Duration,
}

impl Default for KubectlExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl KubectlExecutor {
    /// Create an executor using the default kubeconfig
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: "kubectl".to_string(),
            kubeconfig_path: None,
            command_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        }
    }

    /// Override the binary name (tests and unusual installs)
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Use an alternate kubeconfig profile
    #[must_use]
    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig_path = Some(path.into());
        self
    }

    /// Set command and probe timeouts
    #[must_use]
    pub fn with_timeouts(mut self, command: Duration, probe: Duration) -> Self {
        self.command_timeout = command;
        self.probe_timeout = probe;
        self
    }

    fn full_args(&self, args: &[String]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(path) = &self.kubeconfig_path {
            full.push("--kubeconfig".to_string());
            full.push(path.display().to_string());
        }
        full.extend_from_slice(args);
        full
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut line = self.binary.clone();
        for arg in self.full_args(args) {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    /// Run one validated command with the default timeout.
    pub async fn run(&self, args: &[String]) -> CommandResult {
        self.run_with_timeout(args, self.command_timeout).await
    }

    /// Run one validated command with an explicit timeout.
    ///
    /// The verb allowlist is re-checked here as defense in depth; the gate
    /// upstream should already have filtered anything mutating.
    pub async fn run_with_timeout(&self, args: &[String], timeout: Duration) -> CommandResult {
        let verdict = validate_args(args);
        if !verdict.allowed {
            warn!(command = %self.command_line(args), reason = %verdict.reason, "Refusing to execute command");
            return CommandResult::failed(
                self.command_line(args),
                format!("command rejected: {}", verdict.reason),
            );
        }
        self.spawn(args, timeout).await
    }

    /// Probe cluster connectivity with the short probe timeout.
    pub async fn probe_cluster(&self) -> CommandResult {
        let args = vec!["cluster-info".to_string()];
        self.run_with_timeout(&args, self.probe_timeout).await
    }

    /// Read a file from inside a pod (read-only `exec -- cat`).
    ///
    /// Paths are injection-checked; the verb gate does not apply because
    /// this first-party invocation is fixed to `cat`.
    pub async fn read_pod_file(&self, namespace: &str, pod: &str, path: &str) -> PodFileContent {
        let verdict = verify_path_safety(path);
        if !verdict.allowed {
            return PodFileContent {
                success: false,
                content: String::new(),
                error: Some(format!("file access denied: {}", verdict.reason)),
            };
        }

        let args: Vec<String> = ["exec", pod, "-n", namespace, "--", "cat", path]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = self.spawn(&args, self.command_timeout).await;

        if result.success {
            PodFileContent {
                success: true,
                content: result.stdout,
                error: None,
            }
        } else {
            PodFileContent {
                success: false,
                content: String::new(),
                error: Some(result.error.unwrap_or(result.stderr)),
            }
        }
    }

    /// List a directory from inside a pod (read-only `exec -- ls -la`).
    pub async fn browse_pod_files(&self, namespace: &str, pod: &str, path: &str) -> PodDirListing {
        let path = if path.trim().is_empty() { "/" } else { path };
        let verdict = verify_path_safety(path);
        if !verdict.allowed {
            return PodDirListing {
                success: false,
                path: path.to_string(),
                files: Vec::new(),
                error: Some(format!("path access denied: {}", verdict.reason)),
            };
        }

        let args: Vec<String> = ["exec", pod, "-n", namespace, "--", "ls", "-la", path]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = self.spawn(&args, self.command_timeout).await;

        if result.success {
            PodDirListing {
                success: true,
                path: path.to_string(),
                files: parse_ls_output(&result.stdout),
                error: None,
            }
        } else {
            PodDirListing {
                success: false,
                path: path.to_string(),
                files: Vec::new(),
                error: Some(result.error.unwrap_or(result.stderr)),
            }
        }
    }

    async fn spawn(&self, args: &[String], timeout: Duration) -> CommandResult {
        let full_args = self.full_args(args);
        let command_line = self.command_line(args);

        info!(command = %command_line, "Executing command");

        let mut cmd = Command::new(&self.binary);
        cmd.args(&full_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(binary = %self.binary, "Command binary not found");
                return CommandResult::tool_missing(command_line);
            }
            Err(e) => {
                return CommandResult::failed(command_line, e.to_string());
            }
        };

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return CommandResult::failed(command_line, e.to_string());
            }
            Err(_) => {
                warn!(command = %command_line, timeout_secs = timeout.as_secs(), "Command timed out");
                return CommandResult::failed(
                    command_line,
                    format!("timed out after {}s", timeout.as_secs()),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        let result = triage(command_line, exit_code, stdout, stderr);
        if result.success {
            debug!(command = %result.command, "Command succeeded");
        } else {
            warn!(
                command = %result.command,
                exit_code = result.exit_code,
                error = result.error.as_deref().unwrap_or(""),
                "Command failed"
            );
        }
        result
    }
}
