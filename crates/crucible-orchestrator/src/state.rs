//! The run's only mutable aggregate

use crate::solution::Artifacts;
use crucible_core::{CrucibleError, Result};
use crucible_metrics::{IterationMetrics, IterationSummary, MetricsHistory, PhaseOutputs};
use tracing::info;

/// Artifact bundle of the best iteration so far
#[derive(Debug, Clone, PartialEq)]
pub struct BestSolution {
    pub artifacts: Artifacts,
    /// Metrics snapshot of the iteration that produced it
    pub metrics: IterationSummary,
}

/// Progress of one run
///
/// `best_score` always equals the highest overall score in `history` (0 when
/// empty) and `best` belongs to the iteration that produced it. A later,
/// worse iteration never lowers or clears either.
#[derive(Debug, Default)]
pub struct OrchestrationState {
    iteration: usize,
    best_score: f64,
    best_iteration: usize,
    best: Option<BestSolution>,
    history: MetricsHistory,
}

impl OrchestrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that iteration `iteration` has started
    pub fn begin_iteration(&mut self, iteration: usize) {
        self.iteration = iteration;
    }

    /// Fold a completed iteration into the state
    ///
    /// The best bundle is replaced only on a strictly higher score, so ties
    /// keep the earliest best.
    pub fn complete_iteration(
        &mut self,
        iteration: usize,
        phases: PhaseOutputs,
        overall_score: f64,
    ) -> Result<&IterationMetrics> {
        let new_best = overall_score > self.best_score;
        let metrics = IterationMetrics::new(iteration, phases, overall_score, new_best);
        let candidate = new_best.then(|| BestSolution {
            artifacts: Artifacts::from_phases(&metrics.phases),
            metrics: metrics.summary(),
        });

        // Append first so a rejected entry leaves the best untouched
        self.history.push(metrics)?;

        if let Some(best) = candidate {
            info!(
                "New best score {:.1} at iteration {} (was {:.1})",
                best.metrics.overall_score, iteration, self.best_score
            );
            self.best_score = best.metrics.overall_score;
            self.best_iteration = iteration;
            self.best = Some(best);
        }

        self.history
            .last()
            .ok_or_else(|| CrucibleError::Orchestrator("history empty after append".into()))
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    /// 0 when no iteration has set a best
    pub fn best_iteration(&self) -> usize {
        self.best_iteration
    }

    pub fn best(&self) -> Option<&BestSolution> {
        self.best.as_ref()
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }
}
