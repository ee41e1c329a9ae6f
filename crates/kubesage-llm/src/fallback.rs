//! Deterministic fallback responses
//!
//! When a provider call times out or returns a non-success status, the
//! pipeline must still answer. These canned responses vary by the intended
//! operation so the user gets actionable generic commands instead of a bare
//! apology. None of them contains cluster facts.

/// Which canned response to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// Cluster-wide health questions
    ClusterHealth,
    /// Pod-focused questions
    PodAnalysis,
    /// Output analysis with collected data on hand
    Analysis,
    /// Everything else
    Generic,
}

impl FallbackKind {
    /// Pick the fallback flavor for a user question.
    #[must_use]
    pub fn for_question(question: &str) -> Self {
        let lower = question.to_lowercase();
        if lower.contains("health") || lower.contains("cluster") || lower.contains("node") {
            Self::ClusterHealth
        } else if lower.contains("pod") || lower.contains("container") || lower.contains("crash") {
            Self::PodAnalysis
        } else {
            Self::Generic
        }
    }
}

const CLUSTER_HEALTH_FALLBACK: &str = "\
I'm having trouble reaching my AI service right now, but I can still help \
you check cluster health yourself.

**To check your cluster health, run:**
```bash
kubectl cluster-info
kubectl get nodes
kubectl get namespaces
kubectl get pods --all-namespaces
```

**What to look for:**
- Nodes in Ready status
- Namespaces in Active status
- Pods in Running state
- Any error conditions";

const POD_ANALYSIS_FALLBACK: &str = "\
I'm having trouble reaching my AI service right now. For pod analysis, try \
these commands:

```bash
# List all pods
kubectl get pods --all-namespaces

# Get detailed pod information
kubectl describe pods

# Check pod logs
kubectl logs <pod-name>

# Filter by namespace
kubectl get pods -n <namespace>
```

Look for pods with issues like:
- CrashLoopBackOff
- ImagePullBackOff
- Pending
- Error";

const ANALYSIS_FALLBACK: &str = "\
I collected the command output below but couldn't reach my AI service to \
interpret it. Please review the raw output yourself, or try again in a few \
moments. Pay particular attention to pod statuses other than Running and to \
any events with a Warning type.";

const GENERIC_FALLBACK: &str = "\
I'm having trouble reaching my AI service right now. Please try again in a \
few moments, or contact your administrator if the issue persists.

In the meantime, you can use these basic kubectl commands:
```bash
kubectl get pods
kubectl get services
kubectl get deployments
kubectl get nodes
```";

/// The canned response for an operation.
#[must_use]
pub fn fallback_response(kind: FallbackKind) -> &'static str {
    match kind {
        FallbackKind::ClusterHealth => CLUSTER_HEALTH_FALLBACK,
        FallbackKind::PodAnalysis => POD_ANALYSIS_FALLBACK,
        FallbackKind::Analysis => ANALYSIS_FALLBACK,
        FallbackKind::Generic => GENERIC_FALLBACK,
    }
}
