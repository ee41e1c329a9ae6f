//! Turn orchestration
//!
//! One turn runs as a single blocking sequence:
//! classify → budget → suggest → gate + execute → follow-up → analyze →
//! persist → respond. Commands run one at a time; every external call has
//! an explicit timeout; and every failure short of broken persistence
//! degrades into data that still reaches the analysis step. The session's
//! mutex is held from the first history read until the turn is persisted.

use crate::classify::{Classification, QuestionCategory, QuestionClassifier};
use crate::error::{Error, Result};
use crate::outputs::{CommandOutputs, CommandPhase};
use crate::session::{ConversationTurn, SessionCache};
use crate::store::{ActivityRecord, ChatStore};
use chrono::{DateTime, Utc};
use kubesage_llm::{DiagnosticLlm, ProviderFactory, MAX_FOLLOW_UP_COMMANDS};
use kubesage_tools::{validate_command, KubectlExecutor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Categories that justify a follow-up round.
///
/// The thresholds behind this set belong to the external classifier; the
/// orchestrator only consumes the policy, so it stays configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpPolicy {
    /// Categories allowed to trigger follow-up commands
    pub categories: Vec<QuestionCategory>,
}

impl Default for FollowUpPolicy {
    fn default() -> Self {
        Self {
            categories: vec![
                QuestionCategory::ModerateInvestigation,
                QuestionCategory::DeepAnalysis,
            ],
        }
    }
}

impl FollowUpPolicy {
    /// Whether a category is in the follow-up set
    #[must_use]
    pub fn permits(&self, category: QuestionCategory) -> bool {
        self.categories.contains(&category)
    }
}

/// Orchestrator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// kubectl binary name or path
    #[serde(default = "default_kubectl_binary")]
    pub kubectl_binary: String,
    /// Per-command execution timeout in seconds
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Connectivity probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// How many turns to hydrate from storage per session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Follow-up gating policy
    #[serde(default)]
    pub follow_up: FollowUpPolicy,
}

fn default_kubectl_binary() -> String {
    "kubectl".to_string()
}
fn default_command_timeout_secs() -> u64 {
    30
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_history_limit() -> usize {
    50
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            kubectl_binary: default_kubectl_binary(),
            command_timeout_secs: default_command_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            history_limit: default_history_limit(),
            follow_up: FollowUpPolicy::default(),
        }
    }
}

/// How the response was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// No commands ran; the model answered from general knowledge
    AdviceOnly,
    /// The answer is grounded in executed command output
    CommandBased,
}

/// One inbound chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Session the turn belongs to
    pub session_id: String,
    /// The user's question
    pub message: String,
    /// Acting user
    pub user_id: String,
    /// Provider configuration for this turn; when absent, the store's
    /// active configuration is used
    #[serde(default)]
    pub active_llm_config: Option<kubesage_llm::LlmProviderConfig>,
    /// User preference capping commands per turn
    #[serde(default)]
    pub max_commands: Option<usize>,
}

/// Classification fields exposed in the response
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationSummary {
    /// Question category
    #[serde(rename = "type")]
    pub category: QuestionCategory,
    /// Complexity in [0, 1]
    pub complexity_score: f32,
    /// Classifier confidence in [0, 1]
    pub confidence: f32,
    /// Classification method
    pub method: String,
    /// Rationale
    pub reasoning: String,
    /// Whether follow-up was permitted
    pub follow_up_allowed: bool,
    /// The classifier's command budget suggestion
    pub max_commands_suggested: usize,
}

impl From<&Classification> for ClassificationSummary {
    fn from(c: &Classification) -> Self {
        Self {
            category: c.category,
            complexity_score: c.complexity_score,
            confidence: c.confidence,
            method: c.method.clone(),
            reasoning: c.reasoning.clone(),
            follow_up_allowed: c.follow_up_allowed,
            max_commands_suggested: c.suggested_max_commands,
        }
    }
}

/// One completed turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// The assistant's answer
    pub response: String,
    /// Commands executed, in execution order
    pub commands_executed: Vec<String>,
    /// Classification snapshot
    pub classification: ClassificationSummary,
    /// Session id the turn belongs to
    pub session_id: String,
    /// When the turn completed
    pub timestamp: DateTime<Utc>,
    /// How the response was produced
    pub analysis_type: AnalysisType,
}

/// The turn pipeline
pub struct Orchestrator {
    store: Arc<dyn ChatStore>,
    classifier: Arc<dyn QuestionClassifier>,
    provider_factory: Arc<dyn ProviderFactory>,
    cache: SessionCache,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(
        store: Arc<dyn ChatStore>,
        classifier: Arc<dyn QuestionClassifier>,
        provider_factory: Arc<dyn ProviderFactory>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            provider_factory,
            cache: SessionCache::new(),
            config,
        }
    }

    /// The per-session cache (for eviction on history deletion)
    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Build the executor for this turn from the active kubeconfig.
    async fn executor_for_turn(&self) -> Result<KubectlExecutor> {
        let mut executor = KubectlExecutor::new()
            .with_binary(&self.config.kubectl_binary)
            .with_timeouts(
                Duration::from_secs(self.config.command_timeout_secs),
                Duration::from_secs(self.config.probe_timeout_secs),
            );

        match self.store.get_active_kubeconfig().await? {
            Some(profile) => {
                info!(name = %profile.name, path = %profile.path, "Using active kubeconfig");
                executor = executor.with_kubeconfig(profile.path);
            }
            None => {
                debug!("No active kubeconfig, using default configuration");
            }
        }
        Ok(executor)
    }

    /// Process one turn.
    #[instrument(skip(self, request), fields(session_id = %request.session_id, user_id = %request.user_id))]
    pub async fn process_turn(&self, request: ChatRequest) -> Result<ChatResponse> {
        // Exclusive access to this session until the turn is persisted.
        let slot = self.cache.slot(&request.session_id);
        let mut session = slot.lock().await;

        if !session.is_hydrated() {
            let turns = self
                .store
                .load_turns(&request.session_id, self.config.history_limit)
                .await?;
            session.hydrate(turns);
        }

        let active_config = match request.active_llm_config.clone() {
            Some(config) => Some(config),
            None => self.store.get_active_llm_config().await?,
        };
        let Some(active_config) = active_config else {
            return Err(Error::Configuration(
                "no active LLM configuration; add and activate one first".to_string(),
            ));
        };
        let provider = self.provider_factory.create(&active_config)?;
        let executor = self.executor_for_turn().await?;
        let history = session.chat_messages();

        // CLASSIFY: always yields a value.
        let classification = self
            .classifier
            .classify(&request.message, session.turns(), provider.as_ref())
            .await;
        info!(
            category = classification.category.as_str(),
            score = classification.complexity_score,
            confidence = classification.confidence,
            method = %classification.method,
            "Question classified"
        );

        // BUDGET: classifier suggestion bounded by user preference.
        let effective_budget = request
            .max_commands
            .map_or(classification.suggested_max_commands, |pref| {
                classification.suggested_max_commands.min(pref)
            });

        // SUGGEST: truncate in index order past the budget.
        let mut suggested = provider.suggest_commands(&request.message, &history).await;
        if suggested.len() > effective_budget {
            info!(
                suggested = suggested.len(),
                budget = effective_budget,
                "Truncating suggested commands to budget"
            );
            suggested.truncate(effective_budget);
        }

        // EXECUTE: sequential, gated, every outcome recorded.
        let mut outputs = CommandOutputs::new();
        for command in &suggested {
            self.execute_one(
                &executor,
                CommandPhase::Primary,
                command,
                &classification,
                &request.user_id,
                &mut outputs,
            )
            .await?;
        }

        // FOLLOWUP: only for investigation categories with data in hand.
        if classification.follow_up_allowed
            && !outputs.is_empty()
            && self.config.follow_up.permits(classification.category)
        {
            let mut follow_ups = provider
                .suggest_follow_up_commands(&request.message, &outputs.observations(), &history)
                .await;
            follow_ups.truncate(MAX_FOLLOW_UP_COMMANDS);
            for command in &follow_ups {
                self.execute_one(
                    &executor,
                    CommandPhase::FollowUp,
                    command,
                    &classification,
                    &request.user_id,
                    &mut outputs,
                )
                .await?;
            }
        }

        // ANALYZE: runs whether or not anything executed.
        let analysis_type = if outputs.is_empty() {
            AnalysisType::AdviceOnly
        } else {
            AnalysisType::CommandBased
        };
        let response_text = provider
            .analyze_outputs(&request.message, &outputs.observations(), &history)
            .await;

        // PERSIST: both turns, durable first, then in-memory.
        let commands_executed = outputs.commands_executed();
        let user_turn = ConversationTurn::user(&request.message);
        let assistant_turn = ConversationTurn::assistant(
            &response_text,
            commands_executed.clone(),
            Some(classification.clone()),
        );
        self.store
            .save_turn(&request.session_id, &request.user_id, &user_turn)
            .await?;
        self.store
            .save_turn(&request.session_id, &request.user_id, &assistant_turn)
            .await?;
        session.push(user_turn);
        session.push(assistant_turn);

        self.store
            .log_activity(&ActivityRecord {
                user_id: request.user_id.clone(),
                action: match analysis_type {
                    AnalysisType::AdviceOnly => "advice_query".to_string(),
                    AnalysisType::CommandBased => "investigation_query".to_string(),
                },
                command: None,
                classification: Some(classification.category.as_str().to_string()),
                success: true,
                detail: None,
            })
            .await?;

        info!(
            commands = commands_executed.len(),
            analysis_type = ?analysis_type,
            "Turn completed"
        );

        Ok(ChatResponse {
            response: response_text,
            commands_executed,
            classification: ClassificationSummary::from(&classification),
            session_id: request.session_id,
            timestamp: Utc::now(),
            analysis_type,
        })
    }

    /// Gate and execute one suggested command, recording the outcome.
    ///
    /// A rejected command is logged and dropped; a failed command still
    /// produces a result entry. Neither aborts the turn.
    async fn execute_one(
        &self,
        executor: &KubectlExecutor,
        phase: CommandPhase,
        command: &kubesage_llm::CommandRequest,
        classification: &Classification,
        user_id: &str,
        outputs: &mut CommandOutputs,
    ) -> Result<()> {
        let verdict = validate_command(&command.command);
        if !verdict.allowed {
            warn!(command = %command.command, reason = %verdict.reason, "Command rejected by safety gate");
            self.store
                .log_activity(&ActivityRecord {
                    user_id: user_id.to_string(),
                    action: "command_rejected".to_string(),
                    command: Some(command.command.clone()),
                    classification: Some(classification.category.as_str().to_string()),
                    success: false,
                    detail: Some(verdict.reason),
                })
                .await?;
            return Ok(());
        }

        let result = executor.run(&command.args).await;
        self.store
            .log_activity(&ActivityRecord {
                user_id: user_id.to_string(),
                action: match phase {
                    CommandPhase::Primary => "command_executed".to_string(),
                    CommandPhase::FollowUp => "followup_command_executed".to_string(),
                },
                command: Some(command.command.clone()),
                classification: Some(classification.category.as_str().to_string()),
                success: result.success,
                detail: if result.success {
                    None
                } else {
                    result
                        .error
                        .clone()
                        .or_else(|| Some(result.stderr.clone()).filter(|s| !s.is_empty()))
                },
            })
            .await?;

        outputs.push(phase, command.command.clone(), result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::KeywordClassifier;
    use crate::store::{MockChatStore, SqliteStore};
    use kubesage_llm::{DiagnosticLlm, LlmProviderConfig, MockDiagnosticLlm};
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    /// Factory that hands out one shared scripted mock regardless of config.
    struct FixedFactory(Arc<MockDiagnosticLlm>);

    impl ProviderFactory for FixedFactory {
        fn create(
            &self,
            _config: &LlmProviderConfig,
        ) -> kubesage_llm::Result<Arc<dyn DiagnosticLlm>> {
            Ok(self.0.clone())
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        store: Arc<SqliteStore>,
        llm: Arc<MockDiagnosticLlm>,
        _dir: tempfile::TempDir,
    }

    fn fake_kubectl(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("fake-kubectl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{}", body).unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.display().to_string()
    }

    /// Harness with a real SQLite store, scripted mock LLM, and a fake
    /// kubectl binary (a shell script with the given body).
    async fn harness(kubectl_body: Option<&str>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("test.db")).await.unwrap());
        store
            .set_active_llm_config(&LlmProviderConfig::local("http://localhost:8080", "test"))
            .await
            .unwrap();

        let binary = match kubectl_body {
            Some(body) => fake_kubectl(&dir, body),
            None => "definitely-not-a-real-kubectl".to_string(),
        };
        let llm = Arc::new(MockDiagnosticLlm::new());
        let config = OrchestratorConfig {
            kubectl_binary: binary,
            command_timeout_secs: 1,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::new(
            store.clone(),
            Arc::new(KeywordClassifier::new()),
            Arc::new(FixedFactory(llm.clone())),
            config,
        );
        Harness {
            orchestrator,
            store,
            llm,
            _dir: dir,
        }
    }

    fn request(session_id: &str, message: &str, max_commands: Option<usize>) -> ChatRequest {
        ChatRequest {
            session_id: session_id.to_string(),
            message: message.to_string(),
            user_id: "u1".to_string(),
            active_llm_config: None,
            max_commands,
        }
    }

    #[tokio::test]
    async fn test_empty_suggestions_short_circuit_to_advice() {
        let h = harness(Some("echo ok")).await;
        h.llm.push_analysis("general advice");
        // No suggestions queued: the mock returns an empty list.

        let response = h
            .orchestrator
            .process_turn(request("s1", "hello there", None))
            .await
            .unwrap();

        assert_eq!(response.analysis_type, AnalysisType::AdviceOnly);
        assert!(response.commands_executed.is_empty());
        assert_eq!(response.response, "general advice");

        // Analyze still ran, with an empty output map.
        assert!(h.llm.analyzed.lock().unwrap()[0].is_empty());

        // Both turns persisted.
        let turns = h.store.load_turns("s1", 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, crate::session::TurnRole::Assistant);
    }

    #[tokio::test]
    async fn test_budget_truncates_in_index_order() {
        let h = harness(Some("echo ran")).await;
        h.llm.push_suggestions(&[
            "kubectl get pods -l app=nginx",
            "kubectl describe pod nginx-1",
        ]);

        // Deep question suggests 3; the user preference of 1 wins.
        let response = h
            .orchestrator
            .process_turn(request("s1", "why is my nginx pod failing?", Some(1)))
            .await
            .unwrap();

        assert_eq!(response.commands_executed, vec!["kubectl get pods -l app=nginx"]);
        assert_eq!(response.analysis_type, AnalysisType::CommandBased);
        assert!(
            response.commands_executed.len() <= response.classification.max_commands_suggested
        );
    }

    #[tokio::test]
    async fn test_rejected_command_dropped_not_fatal() {
        let h = harness(Some("echo ran")).await;
        h.llm
            .push_suggestions(&["kubectl delete pod web-0", "kubectl get pods"]);

        let response = h
            .orchestrator
            .process_turn(request("s1", "why is web failing?", None))
            .await
            .unwrap();

        // The mutating command was silently dropped, the safe one ran.
        assert_eq!(response.commands_executed, vec!["kubectl get pods"]);

        let activity = h.store.recent_activity(10).await.unwrap();
        let rejected: Vec<_> = activity
            .iter()
            .filter(|e| e.action == "command_rejected")
            .collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].command.as_deref(), Some("kubectl delete pod web-0"));
    }

    #[tokio::test]
    async fn test_timeout_still_reaches_analyze_and_respond() {
        let h = harness(Some("sleep 5")).await;
        h.llm.push_suggestions(&["kubectl get pods"]);
        h.llm.push_analysis("the command timed out");

        let response = h
            .orchestrator
            .process_turn(request("s1", "why is my pod failing?", Some(1)))
            .await
            .unwrap();

        assert_eq!(response.analysis_type, AnalysisType::CommandBased);
        assert_eq!(response.response, "the command timed out");

        let analyzed = h.llm.analyzed.lock().unwrap();
        let observation = &analyzed[0][0];
        assert!(!observation.success);
        assert!(observation.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_tool_flows_into_analysis() {
        let h = harness(None).await;
        h.llm.push_suggestions(&["kubectl get pods"]);

        let response = h
            .orchestrator
            .process_turn(request("s1", "why is my pod failing?", None))
            .await
            .unwrap();
        assert_eq!(response.analysis_type, AnalysisType::CommandBased);

        let analyzed = h.llm.analyzed.lock().unwrap();
        assert!(!analyzed[0][0].tool_available);
    }

    #[tokio::test]
    async fn test_follow_up_appends_duplicate_commands() {
        let h = harness(Some("echo ran")).await;
        h.llm.push_suggestions(&["kubectl get pods"]);
        h.llm.push_follow_ups(&["kubectl get pods"]);

        let response = h
            .orchestrator
            .process_turn(request("s1", "investigate my failing pods", None))
            .await
            .unwrap();

        // Same command text in both phases: two entries, no overwrite.
        assert_eq!(
            response.commands_executed,
            vec!["kubectl get pods", "kubectl get pods"]
        );
        let analyzed = h.llm.analyzed.lock().unwrap();
        assert_eq!(analyzed[0].len(), 2);
    }

    #[tokio::test]
    async fn test_simple_lookup_skips_follow_up() {
        let h = harness(Some("echo ran")).await;
        h.llm.push_suggestions(&["kubectl get pods"]);
        // A queued follow-up that must never be consumed.
        h.llm.push_follow_ups(&["kubectl describe pod web-0"]);

        let response = h
            .orchestrator
            .process_turn(request("s1", "show me the pods", None))
            .await
            .unwrap();

        assert_eq!(response.commands_executed, vec!["kubectl get pods"]);
        assert!(!response.classification.follow_up_allowed);
    }

    #[tokio::test]
    async fn test_no_active_llm_config_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("test.db")).await.unwrap());
        let orchestrator = Orchestrator::new(
            store,
            Arc::new(KeywordClassifier::new()),
            Arc::new(FixedFactory(Arc::new(MockDiagnosticLlm::new()))),
            OrchestratorConfig::default(),
        );

        let err = orchestrator
            .process_turn(request("s1", "hello", None))
            .await
            .unwrap_err();
        assert!(err.requires_setup());
    }

    #[tokio::test]
    async fn test_request_supplied_config_skips_store_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("test.db")).await.unwrap());
        // Deliberately no active config in the store.
        let orchestrator = Orchestrator::new(
            store,
            Arc::new(KeywordClassifier::new()),
            Arc::new(FixedFactory(Arc::new(MockDiagnosticLlm::new()))),
            OrchestratorConfig::default(),
        );

        let mut req = request("s1", "hello", None);
        req.active_llm_config = Some(LlmProviderConfig::local("http://localhost:8080", "test"));
        let response = orchestrator.process_turn(req).await.unwrap();
        assert_eq!(response.analysis_type, AnalysisType::AdviceOnly);
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces() {
        let mut store = MockChatStore::new();
        store.expect_load_turns().returning(|_, _| Ok(Vec::new()));
        store.expect_get_active_llm_config().returning(|| {
            Ok(Some(LlmProviderConfig::local("http://localhost:8080", "test")))
        });
        store.expect_get_active_kubeconfig().returning(|| Ok(None));
        store.expect_log_activity().returning(|_| Ok(()));
        store
            .expect_save_turn()
            .returning(|_, _, _| Err(Error::Persistence("disk full".to_string())));

        let orchestrator = Orchestrator::new(
            Arc::new(store),
            Arc::new(KeywordClassifier::new()),
            Arc::new(FixedFactory(Arc::new(MockDiagnosticLlm::new()))),
            OrchestratorConfig::default(),
        );

        let err = orchestrator
            .process_turn(request("s1", "hello", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn test_concurrent_turns_same_session_never_interleave() {
        let h = harness(Some("echo ran")).await;
        let orchestrator = Arc::new(h.orchestrator);

        let a = {
            let o = orchestrator.clone();
            tokio::spawn(async move { o.process_turn(request("s1", "hello", None)).await })
        };
        let b = {
            let o = orchestrator.clone();
            tokio::spawn(async move { o.process_turn(request("s1", "thanks", None)).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Whatever order the turns ran in, the history strictly alternates.
        let turns = h.store.load_turns("s1", 10).await.unwrap();
        assert_eq!(turns.len(), 4);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, crate::session::TurnRole::User);
            assert_eq!(pair[1].role, crate::session::TurnRole::Assistant);
        }
    }

    #[tokio::test]
    async fn test_kubeconfig_profile_applied_to_executor() {
        let h = harness(Some("echo \"$@\"")).await;
        h.store
            .set_active_kubeconfig(&crate::store::KubeconfigProfile {
                name: "alt".to_string(),
                path: "/tmp/alt.kubeconfig".to_string(),
            })
            .await
            .unwrap();
        h.llm.push_suggestions(&["kubectl get pods"]);

        h.orchestrator
            .process_turn(request("s1", "show me pods", None))
            .await
            .unwrap();

        let analyzed = h.llm.analyzed.lock().unwrap();
        assert!(analyzed[0][0].stdout.contains("--kubeconfig /tmp/alt.kubeconfig"));
    }
}
