//! End-to-end runs of the loop against scripted in-process backends

use async_trait::async_trait;
use crucible_agent::{
    Agent, AgentContext, AgentRoster, ChunkStream, Gateway, GenerationBackend, GenerationRequest,
    PhaseInput,
};
use crucible_core::{
    AgentOutput, AgentUsage, CrucibleConfig, CrucibleError, PromptLimits, Result, RetryPolicy,
    Role,
};
use crucible_orchestrator::{
    CancelHandle, Orchestrator, OrchestratorConfig, SolutionStatus, StopReason,
};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Answers by role: reviewer replies come from a queue, every other role
/// gets a fixed reply keyed on its prompt
struct ScriptedBackend {
    reviews: Mutex<VecDeque<String>>,
    risk: u32,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(reviews: &[&str], risk: u32) -> Arc<Self> {
        Arc::new(Self {
            reviews: Mutex::new(reviews.iter().map(|r| r.to_string()).collect()),
            risk,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = request.prompt.clone();
        self.prompts.lock().unwrap().push(prompt.clone());

        let reply = if prompt.contains("code review") {
            self.reviews
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default()
        } else if prompt.contains("software security") {
            format!(
                "RISK SCORE: {}\nVULNERABILITIES:\n- SQL injection in search\nFIXES:\n- use bound parameters\n",
                self.risk
            )
        } else if prompt.contains("software architect") {
            "## Components\n- api\n- store".to_string()
        } else if prompt.contains("software testing") {
            "def test_create(): assert create() is not None".to_string()
        } else if prompt.contains("technical writer") {
            "# README\nUsage: run the server".to_string()
        } else {
            "def create():\n    return {}".to_string()
        };
        Ok(reply)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["mistral".into()])
    }

    fn stream(&self, _request: GenerationRequest) -> ChunkStream {
        futures::stream::empty().boxed()
    }

    fn endpoint(&self) -> &str {
        "scripted://"
    }
}

/// Every call fails with a transient error
struct DownBackend;

#[async_trait]
impl GenerationBackend for DownBackend {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        Err(CrucibleError::BackendUnreachable("connection refused".into()))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Err(CrucibleError::BackendUnreachable("connection refused".into()))
    }

    fn stream(&self, _request: GenerationRequest) -> ChunkStream {
        futures::stream::empty().boxed()
    }

    fn endpoint(&self) -> &str {
        "down://"
    }
}

/// Architect that always raises
struct CrashingArchitect;

#[async_trait]
impl Agent for CrashingArchitect {
    fn role(&self) -> Role {
        Role::Architect
    }

    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput> {
        Err(CrucibleError::Agent(format!(
            "architect crashed in iteration {}",
            input.iteration
        )))
    }

    fn usage(&self) -> AgentUsage {
        AgentUsage {
            role: Role::Architect,
            model: "crash".into(),
            call_count: 0,
            estimated_tokens: 0,
        }
    }
}

/// Tester that writes a suite and then asks the run to stop
struct CancellingTester {
    cancel: CancelHandle,
}

#[async_trait]
impl Agent for CancellingTester {
    fn role(&self) -> Role {
        Role::Tester
    }

    async fn execute(&self, _input: &PhaseInput<'_>) -> Result<AgentOutput> {
        self.cancel.cancel();
        Ok(AgentOutput::from_content(
            Role::Tester,
            "def test_smoke(): pass".to_string(),
            5,
        ))
    }

    fn usage(&self) -> AgentUsage {
        AgentUsage {
            role: Role::Tester,
            model: "cancelling".into(),
            call_count: 1,
            estimated_tokens: 5,
        }
    }
}

fn roster(backend: Arc<dyn GenerationBackend>) -> AgentRoster {
    let retry = RetryPolicy::new(2, Duration::from_millis(1), 2.0);
    let gateway = Gateway::new(backend, retry);
    let context = AgentContext::new(Arc::new(gateway), PromptLimits::default());
    AgentRoster::standard(context, &CrucibleConfig::default())
}

#[tokio::test]
async fn test_threshold_reached_on_second_iteration() {
    // review 60 -> 21 + 20 + 20 + 20 = 81; review 100 -> 35 + 60 = 95
    let backend = ScriptedBackend::new(
        &[
            "SCORE: 60\nISSUES:\n- no validation\nRECOMMENDATIONS:\n- validate input",
            "SCORE: 100\nISSUES:\nRECOMMENDATIONS:\n- none needed",
        ],
        20,
    );
    let mut orchestrator = Orchestrator::new(
        roster(backend.clone()),
        OrchestratorConfig::new(10, 90.0).with_language("rust"),
    );

    let solution = orchestrator.run("A todo list HTTP API").await.unwrap();

    assert_eq!(solution.status, SolutionStatus::Success);
    assert_eq!(solution.stop_reason, StopReason::ThresholdReached);
    assert_eq!(solution.iteration, 2);
    assert!((solution.score - 95.0).abs() < 1e-9);
    assert_eq!(solution.metrics.len(), 2);

    let first = &solution.metrics[0];
    assert_eq!(first.reviewer_score, 60.0);
    assert_eq!(first.security_score, 80.0);
    assert_eq!(first.issues_count, 1);
    assert_eq!(
        first.improvements,
        vec!["validate input", "use bound parameters"]
    );

    assert_eq!(solution.artifacts.code, "def create():\n    return {}");
    assert!(solution.artifacts.documentation.starts_with("# README"));

    // Six calls per iteration, in phase order
    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 12);
    assert!(prompts[0].contains("software architect"));
    assert!(prompts[1].contains("expert rust developer"));
    assert!(prompts[5].contains("technical writer"));

    let usage = &solution.agents;
    assert_eq!(usage.len(), 6);
    assert!(usage.iter().all(|u| u.call_count == 2));
}

#[tokio::test]
async fn test_single_iteration_budget() {
    let backend = ScriptedBackend::new(&["SCORE: 10"], 50);
    let mut orchestrator =
        Orchestrator::new(roster(backend), OrchestratorConfig::new(1, 90.0));

    let solution = orchestrator.run("anything").await.unwrap();

    assert_eq!(solution.stop_reason, StopReason::IterationBudgetExhausted);
    assert_eq!(solution.iterations_run, 1);
    assert_eq!(solution.iteration, 1);
    assert!(solution.is_success());
}

#[tokio::test]
async fn test_stagnation_after_three_without_new_best() {
    // 80 -> 93.0 best; three reviews of 50 -> 82.5 each
    let backend = ScriptedBackend::new(&["SCORE: 80", "SCORE: 50", "SCORE: 50", "SCORE: 50"], 0);
    let mut orchestrator =
        Orchestrator::new(roster(backend), OrchestratorConfig::new(10, 99.0));

    let solution = orchestrator.run("anything").await.unwrap();

    assert_eq!(solution.stop_reason, StopReason::Stagnation);
    assert_eq!(solution.metrics.len(), 4);
    assert_eq!(solution.iteration, 1);
    assert!((solution.score - 93.0).abs() < 1e-9);
    assert_eq!(
        orchestrator.state().history().trailing_without_improvement(),
        3
    );
}

#[tokio::test]
async fn test_no_stagnation_with_fewer_than_three_entries() {
    let backend = ScriptedBackend::new(&["SCORE: 80", "SCORE: 50"], 0);
    let mut orchestrator =
        Orchestrator::new(roster(backend), OrchestratorConfig::new(2, 99.0));

    let solution = orchestrator.run("anything").await.unwrap();
    assert_eq!(solution.stop_reason, StopReason::IterationBudgetExhausted);
}

#[tokio::test]
async fn test_unreachable_backend_degrades_to_zero_scores() {
    let mut orchestrator = Orchestrator::new(
        roster(Arc::new(DownBackend)),
        OrchestratorConfig::new(5, 90.0),
    );

    let solution = orchestrator.run("anything").await.unwrap();

    // Every phase soft-fails, so no iteration ever sets a best
    assert_eq!(solution.stop_reason, StopReason::Stagnation);
    assert_eq!(solution.metrics.len(), 3);
    assert!(solution.metrics.iter().all(|m| m.overall_score == 0.0));
    assert_eq!(solution.status, SolutionStatus::Failed);
    assert_eq!(solution.score, 0.0);
}

#[tokio::test]
async fn test_every_iteration_failing_is_a_failed_result() {
    let backend = ScriptedBackend::new(&[], 0);
    let agents = roster(backend.clone()).with_agent(Arc::new(CrashingArchitect));
    let mut orchestrator = Orchestrator::new(agents, OrchestratorConfig::new(3, 90.0));

    let solution = orchestrator.run("anything").await.unwrap();

    assert_eq!(solution.status, SolutionStatus::Failed);
    assert_eq!(solution.stop_reason, StopReason::IterationBudgetExhausted);
    assert_eq!(solution.iterations_run, 3);
    assert!(solution.metrics.is_empty());
    assert!(solution.error.is_some());
    // The architect raised before any backend call
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn test_solution_serializes_for_export() {
    let backend = ScriptedBackend::new(&["SCORE: 100"], 0);
    let mut orchestrator =
        Orchestrator::new(roster(backend), OrchestratorConfig::new(3, 90.0));

    let solution = orchestrator.run("anything").await.unwrap();
    let json = serde_json::to_value(&solution).unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["iteration"], 1);
    assert_eq!(json["stop_reason"], "threshold_reached");
    assert!(json["artifacts"]["tests"]
        .as_str()
        .unwrap()
        .contains("test_create"));
    assert_eq!(json["metrics"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_worked_example_reaches_threshold() {
    // 70 * 0.35 + (100 - 20) * 0.25 + 100 * 0.20 + 100 * 0.20 = 84.5
    let backend = ScriptedBackend::new(&["SCORE: 70"], 20);
    let mut orchestrator =
        Orchestrator::new(roster(backend), OrchestratorConfig::new(10, 75.0));

    let solution = orchestrator.run("A todo list HTTP API").await.unwrap();

    assert_eq!(solution.stop_reason, StopReason::ThresholdReached);
    assert_eq!(solution.stop_reason.to_string(), "threshold reached");
    assert_eq!(solution.iteration, 1);
    assert_eq!(solution.iterations_run, 1);
    assert!((solution.score - 84.5).abs() < 1e-9);
    assert_eq!(solution.metrics[0].reviewer_score, 70.0);
    assert_eq!(solution.metrics[0].security_score, 80.0);
}

#[tokio::test]
async fn test_cancel_between_iterations_keeps_first_result() {
    let backend = ScriptedBackend::new(&["SCORE: 40", "SCORE: 100"], 0);
    let cancel = CancelHandle::new();
    let agents = roster(backend.clone()).with_agent(Arc::new(CancellingTester {
        cancel: cancel.clone(),
    }));
    let mut orchestrator = Orchestrator::new(agents, OrchestratorConfig::new(10, 99.0))
        .with_cancel_handle(cancel.clone());

    let solution = orchestrator.run("anything").await.unwrap();

    // Iteration 1 finishes all six phases; iteration 2 never starts
    assert_eq!(solution.stop_reason, StopReason::Cancelled);
    assert_eq!(solution.iterations_run, 1);
    assert_eq!(solution.metrics.len(), 1);
    assert_eq!(solution.iteration, 1);
    assert!(solution.is_success());
    assert!(solution.artifacts.tests.contains("test_smoke"));
    assert_eq!(backend.prompts().len(), 5);
    assert!(!cancel.is_cancelled());
}
