//! The iteration loop
//!
//! Each iteration runs the six phases strictly in order, fuses the scores,
//! folds the result into [`OrchestrationState`], and asks the pure state
//! machine whether to continue. An error inside an iteration abandons that
//! iteration only; the loop moves on to the next index.

use crate::cancel::CancelHandle;
use crate::scoring::ScoreWeights;
use crate::solution::{Artifacts, Solution, SolutionStatus};
use crate::state::OrchestrationState;
use crate::state_machine::{transition, Action, Event, IterationOutcome, State, StopCriteria, StopReason};
use crucible_agent::{AgentRoster, PhaseInput};
use crucible_core::{AgentOutput, CrucibleError, Result, Role, RunConfig};
use crucible_metrics::PhaseOutputs;
use tracing::{debug, info, warn};

/// Loop parameters
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Iteration budget (1-20)
    pub max_iterations: usize,
    /// Overall score at which the loop stops (50-100)
    pub quality_threshold: f64,
    /// Language the developer writes in
    pub target_language: String,
}

impl OrchestratorConfig {
    pub fn new(max_iterations: usize, quality_threshold: f64) -> Self {
        Self {
            max_iterations,
            quality_threshold,
            target_language: "python".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }

    fn criteria(&self) -> StopCriteria {
        StopCriteria {
            max_iterations: self.max_iterations,
            quality_threshold: self.quality_threshold,
        }
    }
}

impl From<&RunConfig> for OrchestratorConfig {
    fn from(run: &RunConfig) -> Self {
        Self::new(run.max_iterations, run.quality_threshold).with_language(&run.target_language)
    }
}

/// Drives agents through iterations until a stop criterion holds
pub struct Orchestrator {
    roster: AgentRoster,
    config: OrchestratorConfig,
    weights: ScoreWeights,
    state: OrchestrationState,
    cancel: CancelHandle,
}

impl Orchestrator {
    pub fn new(roster: AgentRoster, config: OrchestratorConfig) -> Self {
        Self {
            roster,
            config,
            weights: ScoreWeights::default(),
            state: OrchestrationState::new(),
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Share an externally created cancel handle
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops the loop before its next iteration
    ///
    /// A request is consumed when the run it stopped returns, so the same
    /// handle stays usable across runs.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    /// Run the loop on `requirements` and package the best result
    ///
    /// A run in which no iteration completes still returns `Ok` with a
    /// failed [`Solution`]. `Err` means the loop itself was misused or its
    /// history was corrupted. A pending cancellation is consumed either way.
    pub async fn run(&mut self, requirements: &str) -> Result<Solution> {
        let result = self.drive(requirements).await;
        self.cancel.reset();
        result
    }

    async fn drive(&mut self, requirements: &str) -> Result<Solution> {
        self.state = OrchestrationState::new();
        let criteria = self.config.criteria();

        let (mut machine, mut actions) = transition(State::Idle, Event::Start, &criteria);

        loop {
            let mut next_iteration = None;
            for action in actions.drain(..) {
                match action {
                    Action::LogActivity { message } => info!("{}", message),
                    Action::RunIteration { iteration } => next_iteration = Some(iteration),
                    Action::Finish { .. } => {}
                }
            }

            match &machine {
                State::Stopped { reason, iteration } => {
                    return Ok(self.package(*reason, *iteration));
                }
                State::Failed { error } => {
                    return Err(CrucibleError::Orchestrator(error.clone()));
                }
                State::Idle | State::Running { .. } => {}
            }

            let iteration = next_iteration.ok_or_else(|| {
                CrucibleError::Orchestrator(format!("no iteration scheduled in state {:?}", machine))
            })?;

            let event = if self.cancel.is_cancelled() {
                info!("Cancellation requested before iteration {}", iteration);
                Event::CancelRequested
            } else {
                self.iteration_event(requirements, iteration).await?
            };

            (machine, actions) = transition(machine, event, &criteria);
        }
    }

    /// Run one iteration and turn its outcome into a state machine event
    async fn iteration_event(&mut self, requirements: &str, iteration: usize) -> Result<Event> {
        info!(
            "=== Iteration {} of {} ===",
            iteration, self.config.max_iterations
        );
        self.state.begin_iteration(iteration);

        let phases = match self.run_phases(requirements, iteration).await {
            Ok(phases) => phases,
            Err(e) => {
                warn!("Iteration {} failed, discarding it: {}", iteration, e);
                return Ok(Event::IterationAbandoned {
                    error: e.to_string(),
                });
            }
        };

        let overall = self.weights.fuse(
            &phases.review,
            &phases.security,
            &phases.testing,
            &phases.documentation,
        );

        let metrics = self.state.complete_iteration(iteration, phases, overall)?;
        info!(
            "Iteration {} scored {:.1} (review {:.1}, security {:.1}, {} issues)",
            iteration,
            metrics.overall_score,
            metrics.reviewer_score,
            metrics.security_score,
            metrics.issues_count
        );
        let overall_score = metrics.overall_score;

        let history = self.state.history();
        Ok(Event::IterationCompleted(IterationOutcome {
            overall_score,
            history_len: history.len(),
            trailing_without_improvement: history.trailing_without_improvement(),
        }))
    }

    /// The six phases in order, each fed by the outputs it depends on
    async fn run_phases(&self, requirements: &str, iteration: usize) -> Result<PhaseOutputs> {
        let base = PhaseInput {
            requirements,
            language: &self.config.target_language,
            iteration,
            ..PhaseInput::default()
        };

        let architecture = self.phase(Role::Architect, base).await?;

        let development = self
            .phase(
                Role::Developer,
                PhaseInput {
                    architecture: &architecture.content,
                    ..base
                },
            )
            .await?;

        let with_code = PhaseInput {
            architecture: &architecture.content,
            code: &development.content,
            ..base
        };
        let review = self.phase(Role::Reviewer, with_code).await?;
        let security = self.phase(Role::Security, with_code).await?;
        let testing = self.phase(Role::Tester, with_code).await?;
        let documentation = self.phase(Role::Documentation, with_code).await?;

        Ok(PhaseOutputs {
            architecture,
            development,
            review,
            security,
            testing,
            documentation,
        })
    }

    async fn phase(&self, role: Role, input: PhaseInput<'_>) -> Result<AgentOutput> {
        info!("[{}] running", role.title());
        let output = self.roster.get(role).execute(&input).await?;

        if output.success {
            debug!(
                "[{}] {} chars, score {:.1}, ~{} tokens",
                role.title(),
                output.content.len(),
                output.score_or_zero(),
                output.token_count
            );
        } else {
            warn!("[{}] produced no content", role.title());
        }

        Ok(output)
    }

    fn package(&self, stop_reason: StopReason, iterations_run: usize) -> Solution {
        let history = self.state.history();
        let elapsed_secs = history
            .elapsed()
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        let (status, artifacts, error) = match self.state.best() {
            Some(best) => (SolutionStatus::Success, best.artifacts.clone(), None),
            None => {
                warn!(
                    "No iteration produced a solution ({} attempted)",
                    iterations_run
                );
                (
                    SolutionStatus::Failed,
                    Artifacts::default(),
                    Some("no iteration produced a solution".to_string()),
                )
            }
        };

        info!(
            "Run finished: {} after {} iteration(s), best {:.1} at iteration {}",
            stop_reason,
            iterations_run,
            self.state.best_score(),
            self.state.best_iteration()
        );

        Solution {
            status,
            iteration: self.state.best_iteration(),
            score: self.state.best_score(),
            artifacts,
            metrics: history.summaries(),
            stop_reason,
            iterations_run,
            agents: self.roster.usage(),
            elapsed_secs,
            error,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("weights", &self.weights)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
