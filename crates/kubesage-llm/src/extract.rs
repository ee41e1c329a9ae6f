//! Command extraction from model prose
//!
//! Models wrap suggested commands in markdown lists, numbering, and code
//! fences no matter how firmly the prompt forbids it. This module strips
//! that decoration and keeps only lines that are recognizable kubectl
//! invocations, truncated to the caller's cap.

use serde::{Deserialize, Serialize};

/// A single suggested read-only diagnostic command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Full command line, `kubectl` prefix included
    pub command: String,
    /// Argument vector with the `kubectl` prefix removed
    pub args: Vec<String>,
}

impl CommandRequest {
    /// Parse one cleaned-up line into a command request.
    ///
    /// Returns `None` unless the line is a kubectl invocation with at least
    /// one argument.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let rest = line.strip_prefix("kubectl ")?;
        let args: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        if args.is_empty() {
            return None;
        }
        Some(Self {
            command: format!("kubectl {}", args.join(" ")),
            args,
        })
    }
}

/// Strip markdown list markers, numbering, and inline code ticks.
fn clean_line(line: &str) -> &str {
    let mut line = line.trim();
    line = line.trim_start_matches(['-', '*', '>']).trim_start();
    // "1." / "2)" style numbering
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            line = stripped.trim_start();
        }
    }
    line.trim_matches('`').trim()
}

/// Extract up to `cap` kubectl invocations from model output.
///
/// Lines without a `kubectl ` token and code-fence markers are skipped;
/// surrounding prose on a matching line is discarded.
#[must_use]
pub fn extract_commands(content: &str, cap: usize) -> Vec<CommandRequest> {
    let mut commands = Vec::new();
    for raw in content.lines() {
        let line = clean_line(raw);
        if line.is_empty() || line.starts_with("```") {
            continue;
        }
        let Some(start) = line.find("kubectl ") else {
            continue;
        };
        // Inline code ends the command even mid-line.
        let segment = line[start..].split('`').next().unwrap_or_default();
        if let Some(request) = CommandRequest::parse(segment) {
            commands.push(request);
        }
        if commands.len() == cap {
            break;
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_non_kubectl() {
        assert!(CommandRequest::parse("docker ps").is_none());
        assert!(CommandRequest::parse("kubectl").is_none());
        assert!(CommandRequest::parse("kubectl ").is_none());
    }

    #[test]
    fn test_parse_splits_args() {
        let request = CommandRequest::parse("kubectl get pods -n default").unwrap();
        assert_eq!(request.args, vec!["get", "pods", "-n", "default"]);
        assert_eq!(request.command, "kubectl get pods -n default");
    }

    #[test]
    fn test_extract_from_markdown_list() {
        let content = "\
Here are the commands:
- kubectl get pods -l app=nginx
* kubectl describe pod nginx-1
1. kubectl logs nginx-1 --tail 50";
        let commands = extract_commands(content, 3);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].command, "kubectl get pods -l app=nginx");
        assert_eq!(commands[2].args[0], "logs");
    }

    #[test]
    fn test_extract_skips_prose_and_fences() {
        let content = "\
You should inspect the pods first.
```bash
kubectl get pods --all-namespaces
```
Then look at `kubectl describe pod web-0` for details.";
        let commands = extract_commands(content, 3);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command, "kubectl get pods --all-namespaces");
        assert_eq!(commands[1].command, "kubectl describe pod web-0");
    }

    #[test]
    fn test_extract_respects_cap() {
        let content = "\
kubectl get pods
kubectl get deployments
kubectl get services
kubectl get events";
        let commands = extract_commands(content, 3);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2].command, "kubectl get services");
    }

    #[test]
    fn test_extract_nothing_from_refusal() {
        let content = "I cannot suggest any commands for this question.";
        assert!(extract_commands(content, 3).is_empty());
    }
}
