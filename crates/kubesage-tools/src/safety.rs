//! Command safety gate
//!
//! Pure validation of candidate kubectl invocations before anything is
//! spawned. Only allow-listed read-only verbs pass; everything mutating
//! (create/apply/delete/edit/exec/...) is rejected by omission. Shell
//! metacharacters are rejected outright — commands run as argument vectors,
//! never through a shell, and in-pod path arguments are interpolated into
//! `cat`/`ls` invocations where chaining characters would be dangerous.

/// Read-only kubectl verbs that may execute
pub const READ_ONLY_VERBS: &[&str] = &[
    "get",
    "describe",
    "logs",
    "top",
    "events",
    "explain",
    "cluster-info",
    "version",
    "api-resources",
    "api-versions",
];

/// Shell metacharacters associated with chaining and substitution
pub const SHELL_METACHARACTERS: &[char] = &['|', '&', ';', '`', '$', '(', ')'];

/// Outcome of gate validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the command may run
    pub allowed: bool,
    /// Why it was allowed or rejected
    pub reason: String,
}

impl Verdict {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Find the first shell metacharacter in a string, if any.
#[must_use]
pub fn contains_shell_metacharacters(s: &str) -> Option<char> {
    s.chars().find(|c| SHELL_METACHARACTERS.contains(c))
}

/// Validate a full command string as written by the model.
///
/// The `kubectl` prefix is optional; the first token after it must be an
/// allow-listed read-only verb.
#[must_use]
pub fn validate_command(command: &str) -> Verdict {
    let trimmed = command.trim();
    let rest = trimmed.strip_prefix("kubectl").unwrap_or(trimmed).trim_start();

    let Some(verb) = rest.split_whitespace().next() else {
        return Verdict::deny("empty command");
    };

    if let Some(ch) = contains_shell_metacharacters(rest) {
        return Verdict::deny(format!("shell metacharacter '{}' in command", ch));
    }

    validate_verb(verb)
}

/// Validate an argument vector (defense-in-depth check in the executor).
#[must_use]
pub fn validate_args(args: &[String]) -> Verdict {
    let Some(verb) = args.first() else {
        return Verdict::deny("empty command");
    };
    validate_verb(verb)
}

fn validate_verb(verb: &str) -> Verdict {
    if READ_ONLY_VERBS.contains(&verb) {
        Verdict::allow(format!("'{}' is a read-only verb", verb))
    } else {
        Verdict::deny(format!("verb '{}' is not in the read-only allowlist", verb))
    }
}

/// Validate an in-pod file or directory path before it is interpolated into
/// a `cat`/`ls` invocation. Read access to any path is allowed; only
/// injection attempts are rejected.
#[must_use]
pub fn verify_path_safety(path: &str) -> Verdict {
    let path = path.trim();
    if path.is_empty() {
        return Verdict::allow("empty path defaults to /");
    }
    if let Some(ch) = contains_shell_metacharacters(path) {
        return Verdict::deny(format!("invalid character '{}' in path", ch));
    }
    Verdict::allow("path is safe for read access")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_verbs_pass() {
        for verb in READ_ONLY_VERBS {
            let verdict = validate_command(&format!("kubectl {} pods", verb));
            assert!(verdict.allowed, "verb '{}' should pass: {}", verb, verdict.reason);
        }
    }

    #[test]
    fn test_mutating_verbs_rejected() {
        for cmd in [
            "kubectl apply -f deploy.yaml",
            "kubectl delete pod web-0",
            "kubectl edit deployment web",
            "kubectl create namespace test",
            "kubectl patch svc web -p '{}'",
            "kubectl scale deploy web --replicas=0",
            "kubectl exec -it web-0 -- bash",
            "kubectl drain node-1",
        ] {
            let verdict = validate_command(cmd);
            assert!(!verdict.allowed, "'{}' should be rejected", cmd);
        }
    }

    #[test]
    fn test_prefix_optional() {
        assert!(validate_command("get pods -n default").allowed);
        assert!(!validate_command("delete pods --all").allowed);
    }

    #[test]
    fn test_metacharacters_rejected() {
        for cmd in [
            "kubectl get pods; rm -rf /",
            "kubectl logs web-0 | tee /tmp/x",
            "kubectl get pods $(whoami)",
            "kubectl get pods `id`",
            "kubectl get pods && kubectl delete pods",
        ] {
            let verdict = validate_command(cmd);
            assert!(!verdict.allowed, "'{}' should be rejected", cmd);
            assert!(verdict.reason.contains("metacharacter"));
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(!validate_command("").allowed);
        assert!(!validate_command("kubectl").allowed);
        assert!(!validate_args(&[]).allowed);
    }

    #[test]
    fn test_args_vector_check() {
        let ok: Vec<String> = ["get", "pods"].iter().map(|s| s.to_string()).collect();
        assert!(validate_args(&ok).allowed);

        let bad: Vec<String> = ["exec", "web-0", "--", "sh"].iter().map(|s| s.to_string()).collect();
        assert!(!validate_args(&bad).allowed);
    }

    #[test]
    fn test_pod_path_safety() {
        assert!(verify_path_safety("/var/log/app.log").allowed);
        assert!(verify_path_safety("").allowed);
        assert!(verify_path_safety("relative/path").allowed);

        for path in ["/etc; rm -rf /", "/tmp/$(id)", "/tmp/`id`", "/a|b", "/a&b"] {
            assert!(!verify_path_safety(path).allowed, "'{}' should be rejected", path);
        }
    }
}
