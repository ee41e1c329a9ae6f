//! Prompt construction shared by all backend variants
//!
//! One place builds every system prompt and message list so the two
//! transports cannot drift apart. The analysis prompt adapts to what the
//! collected data actually shows: no data at all, a missing kubectl binary,
//! or an unreachable cluster each get explicit instructions so the model
//! states the situation instead of inventing cluster facts.

use crate::message::ChatMessage;
use crate::observation::CommandObservation;

/// How many history messages are carried into a model call
pub const MAX_HISTORY_MESSAGES: usize = 10;

pub(crate) const SUGGEST_SYSTEM_PROMPT: &str = "\
You are a Kubernetes expert. Based on the user's question, suggest the most \
appropriate kubectl commands to investigate their issue.

Guidelines:
- Suggest ONLY read-only kubectl commands (get, describe, logs, top)
- Focus on the specific resources mentioned (pods, deployments, services, nodes, etc.)
- Be specific with resource names when possible
- Limit to 1-3 essential commands
- Format as a simple list of commands only, no explanations

Example:
User: \"Why is my nginx pod failing?\"
Commands:
- kubectl get pods -l app=nginx
- kubectl describe pod <nginx-pod-name>
- kubectl logs <nginx-pod-name>";

pub(crate) const FOLLOW_UP_SYSTEM_PROMPT: &str = "\
You are a Kubernetes expert. Based on the initial investigation results, \
suggest follow-up commands to dig deeper into any issues found.

Guidelines:
- Suggest ONLY read-only kubectl commands (get, describe, logs, top, events)
- Focus on investigating problems identified in the first round
- Be specific with resource names and namespaces
- Limit to 1-2 essential follow-up commands
- Consider what additional information would be most helpful

Examples:
If pods are failing: check pod logs, describe pods, check events
If deployments have issues: check deployment status, check replica sets
If resource issues: check resource quotas, node status";

const ANALYSIS_BASE_PROMPT: &str = "\
You are a Kubernetes expert analyzing command outputs to help the user.

Your task:
1. Analyze the provided kubectl command outputs
2. Identify any issues, problems, or important information
3. Provide clear, actionable insights
4. Suggest specific next steps if there are problems
5. Be conversational and helpful

Focus on:
- Pod status issues (CrashLoopBackOff, ImagePullBackOff, Pending, etc.)
- Resource constraints (CPU, memory)
- Configuration problems
- Network issues
- Error messages and their meanings

Be honest about what you can and cannot determine from the outputs. Never \
make up cluster information: only use the real data below.";

const NO_DATA_PROMPT: &str = "\

NO REAL KUBERNETES DATA AVAILABLE:
- No commands were executed for this question
- Do not make up any cluster information
- Suggest commands the user can run to get real data
- Be clear that you are answering from general knowledge only";

const TOOL_MISSING_PROMPT: &str = "\

KUBECTL NOT AVAILABLE:
- The kubectl binary is not installed or not found in PATH
- Tell the user to install kubectl or ensure it is available
- Point at https://kubernetes.io/docs/tasks/tools/ for installation";

const UNREACHABLE_PROMPT: &str = "\

CLUSTER CONNECTION ISSUE:
- The cluster could not be reached with the active kubeconfig
- Tell the user to check that the cluster is running and the kubeconfig \
path is correct
- Do not speculate about cluster state";

/// Window the conversation history to the most recent messages.
#[must_use]
pub fn recent_history(history: &[ChatMessage]) -> &[ChatMessage] {
    let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    &history[start..]
}

/// Render executed commands and their outputs for the model.
#[must_use]
pub fn format_observations(outputs: &[CommandObservation]) -> String {
    let mut text = String::new();
    for obs in outputs {
        text.push_str(&format!("\n\nCommand: {}\n", obs.command));
        if obs.success {
            let stdout = if obs.stdout.is_empty() {
                "No output"
            } else {
                obs.stdout.as_str()
            };
            text.push_str(&format!("Output:\n{}\n", stdout));
        } else {
            let detail = obs
                .error
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| {
                    if obs.stderr.is_empty() {
                        "Unknown error"
                    } else {
                        obs.stderr.as_str()
                    }
                });
            text.push_str(&format!("Error:\n{}\n", detail));
        }
    }
    text
}

fn analysis_system_prompt(outputs: &[CommandObservation]) -> String {
    let mut prompt = ANALYSIS_BASE_PROMPT.to_string();
    if outputs.is_empty() {
        prompt.push_str(NO_DATA_PROMPT);
    } else if outputs.iter().any(|o| !o.tool_available) {
        prompt.push_str(TOOL_MISSING_PROMPT);
    } else if outputs.iter().any(|o| !o.target_reachable) {
        prompt.push_str(UNREACHABLE_PROMPT);
    }
    prompt
}

/// Messages for a command-suggestion call.
#[must_use]
pub fn suggestion_messages(question: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SUGGEST_SYSTEM_PROMPT)];
    messages.extend_from_slice(recent_history(history));
    messages.push(ChatMessage::user(format!("User question: {}", question)));
    messages
}

/// Messages for an output-analysis call.
#[must_use]
pub fn analysis_messages(
    question: &str,
    outputs: &[CommandObservation],
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(analysis_system_prompt(outputs))];
    messages.extend_from_slice(recent_history(history));
    messages.push(ChatMessage::user(format!(
        "User question: {}\n\nCommand outputs:{}",
        question,
        format_observations(outputs)
    )));
    messages
}

/// Messages for a follow-up suggestion call.
#[must_use]
pub fn follow_up_messages(
    question: &str,
    outputs: &[CommandObservation],
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(FOLLOW_UP_SYSTEM_PROMPT)];
    messages.extend_from_slice(recent_history(history));
    messages.push(ChatMessage::user(format!(
        "Original question: {}\n\nInitial investigation results:{}\n\n\
         Suggest 1-2 follow-up commands to investigate further.",
        question,
        format_observations(outputs)
    )));
    messages
}
