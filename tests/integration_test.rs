//! Integration tests for Kubesage
//!
//! These tests verify the integration between crates:
//! - kubesage-core: orchestrator, session cache, SQLite store
//! - kubesage-llm: provider factory and scripted mock provider
//! - kubesage-tools: safety gate and executor (driven by a fake kubectl)

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use kubesage_core::{
    AnalysisType, ChatRequest, ChatStore, KeywordClassifier, Orchestrator, OrchestratorConfig,
    SqliteStore, TurnRole,
};
use kubesage_llm::{
    ClientFactory, DiagnosticLlm, LlmProviderConfig, LlmTimeouts, MockDiagnosticLlm,
    ProviderFactory, ProviderKind,
};

struct FixedFactory(Arc<MockDiagnosticLlm>);

impl ProviderFactory for FixedFactory {
    fn create(&self, _config: &LlmProviderConfig) -> kubesage_llm::Result<Arc<dyn DiagnosticLlm>> {
        Ok(self.0.clone())
    }
}

fn fake_kubectl(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("fake-kubectl");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\necho \"NAME READY STATUS\"").unwrap();
    let mut perms = file.metadata().unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.display().to_string()
}

async fn build_stack(
    dir: &tempfile::TempDir,
) -> (Orchestrator, Arc<SqliteStore>, Arc<MockDiagnosticLlm>) {
    let store = Arc::new(SqliteStore::new(dir.path().join("kubesage.db")).await.unwrap());
    store
        .set_active_llm_config(&LlmProviderConfig::local("http://localhost:8080", "test"))
        .await
        .unwrap();

    let llm = Arc::new(MockDiagnosticLlm::new());
    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::new(KeywordClassifier::new()),
        Arc::new(FixedFactory(llm.clone())),
        OrchestratorConfig {
            kubectl_binary: fake_kubectl(dir),
            ..OrchestratorConfig::default()
        },
    );
    (orchestrator, store, llm)
}

fn request(session_id: &str, message: &str) -> ChatRequest {
    ChatRequest {
        session_id: session_id.to_string(),
        message: message.to_string(),
        user_id: "tester".to_string(),
        active_llm_config: None,
        max_commands: None,
    }
}

#[tokio::test]
async fn test_full_turn_with_follow_up_round() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store, llm) = build_stack(&dir).await;

    llm.push_suggestions(&["kubectl get pods --all-namespaces"]);
    llm.push_follow_ups(&["kubectl describe pod web-0"]);
    llm.push_analysis("web-0 is in CrashLoopBackOff");

    let response = orchestrator
        .process_turn(request("it-session", "investigate why web-0 keeps failing"))
        .await
        .unwrap();

    assert_eq!(response.analysis_type, AnalysisType::CommandBased);
    assert_eq!(
        response.commands_executed,
        vec!["kubectl get pods --all-namespaces", "kubectl describe pod web-0"]
    );
    assert_eq!(response.response, "web-0 is in CrashLoopBackOff");
    assert!(response.classification.follow_up_allowed);

    // Both rounds landed in the activity log.
    let activity = store.recent_activity(10).await.unwrap();
    assert!(activity.iter().any(|e| e.action == "command_executed"));
    assert!(activity.iter().any(|e| e.action == "followup_command_executed"));
}

#[tokio::test]
async fn test_mutating_suggestion_never_executes() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, store, llm) = build_stack(&dir).await;

    llm.push_suggestions(&["kubectl delete namespace prod", "kubectl get pods"]);

    let response = orchestrator
        .process_turn(request("it-session", "what is wrong with prod?"))
        .await
        .unwrap();

    assert_eq!(response.commands_executed, vec!["kubectl get pods"]);
    let activity = store.recent_activity(10).await.unwrap();
    let rejected = activity
        .iter()
        .find(|e| e.action == "command_rejected")
        .expect("rejection must be audited");
    assert_eq!(rejected.command.as_deref(), Some("kubectl delete namespace prod"));
}

#[tokio::test]
async fn test_history_survives_cache_eviction() {
    let dir = tempfile::tempdir().unwrap();
    let (orchestrator, _store, llm) = build_stack(&dir).await;

    llm.push_analysis("first answer");
    orchestrator
        .process_turn(request("sticky", "hello"))
        .await
        .unwrap();

    // Evict the in-memory state; the next turn must rehydrate from SQLite.
    assert!(orchestrator.cache().remove("sticky"));

    llm.push_analysis("second answer");
    orchestrator
        .process_turn(request("sticky", "thanks"))
        .await
        .unwrap();

    let turns = _store.load_turns("sticky", 10).await.unwrap();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, TurnRole::User);
    assert_eq!(turns[3].message, "second answer");
}

#[tokio::test]
async fn test_factory_builds_provider_from_stored_config() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("kubesage.db")).await.unwrap();

    store
        .set_active_llm_config(&LlmProviderConfig::local("http://localhost:11434", "llama3.2"))
        .await
        .unwrap();

    let active = store.get_active_llm_config().await.unwrap().unwrap();
    assert_eq!(active.provider, ProviderKind::Local);

    let provider = ClientFactory::new(LlmTimeouts::default()).create(&active).unwrap();
    let info = provider.provider_info();
    assert_eq!(info.provider, "local");
    assert_eq!(info.model, "llama3.2");
    assert!(info.endpoint.contains("11434"));
}
