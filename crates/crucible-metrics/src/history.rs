//! Per-iteration metrics and the append-only run history

use chrono::{DateTime, Duration, Utc};
use crucible_core::{AgentOutput, CrucibleError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The six phase outputs of one iteration, in phase order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutputs {
    pub architecture: AgentOutput,
    pub development: AgentOutput,
    pub review: AgentOutput,
    pub security: AgentOutput,
    pub testing: AgentOutput,
    pub documentation: AgentOutput,
}

/// Outcome of one completed iteration
///
/// Built once when the iteration completes and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationMetrics {
    /// 1-based iteration index
    pub iteration: usize,
    pub timestamp: DateTime<Utc>,
    pub phases: PhaseOutputs,
    pub reviewer_score: f64,
    pub security_score: f64,
    /// Fused score in [0, 100]
    pub overall_score: f64,
    /// Issues raised by the reviewer
    pub issues_count: usize,
    /// Reviewer recommendations followed by security fixes
    pub improvements: Vec<String>,
    /// Whether this iteration set a new best score
    pub new_best: bool,
}

impl IterationMetrics {
    pub fn new(iteration: usize, phases: PhaseOutputs, overall_score: f64, new_best: bool) -> Self {
        let improvements = phases
            .review
            .recommendations
            .iter()
            .chain(phases.security.recommendations.iter())
            .cloned()
            .collect();

        Self {
            iteration,
            timestamp: Utc::now(),
            reviewer_score: phases.review.score_or_zero(),
            security_score: phases.security.score_or_zero(),
            issues_count: phases.review.issues.len(),
            improvements,
            overall_score: overall_score.clamp(0.0, 100.0),
            new_best,
            phases,
        }
    }

    /// Content-free record for reports and the exported result
    pub fn summary(&self) -> IterationSummary {
        IterationSummary {
            iteration: self.iteration,
            timestamp: self.timestamp,
            overall_score: self.overall_score,
            reviewer_score: self.reviewer_score,
            security_score: self.security_score,
            issues_count: self.issues_count,
            security_issues_count: self.phases.security.issues.len(),
            improvements: self.improvements.clone(),
            new_best: self.new_best,
        }
    }
}

/// Per-iteration summary record of the exported result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
    pub reviewer_score: f64,
    pub security_score: f64,
    pub issues_count: usize,
    pub security_issues_count: usize,
    pub improvements: Vec<String>,
    pub new_best: bool,
}

/// Append-only, execution-ordered record of completed iterations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsHistory {
    entries: Vec<IterationMetrics>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed iteration; indices must strictly increase
    pub fn push(&mut self, metrics: IterationMetrics) -> Result<()> {
        if let Some(last) = self.entries.last() {
            if metrics.iteration <= last.iteration {
                return Err(CrucibleError::Metrics(format!(
                    "iteration {} recorded after iteration {}",
                    metrics.iteration, last.iteration
                )));
            }
        }

        debug!(
            "Recorded iteration {} (overall {:.1}, new best: {})",
            metrics.iteration, metrics.overall_score, metrics.new_best
        );
        self.entries.push(metrics);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IterationMetrics> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&IterationMetrics> {
        self.entries.last()
    }

    /// The last `n` entries (fewer if the history is shorter)
    pub fn recent(&self, n: usize) -> &[IterationMetrics] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Highest overall score recorded, 0 when empty
    pub fn max_score(&self) -> f64 {
        self.entries
            .iter()
            .map(|m| m.overall_score)
            .fold(0.0, f64::max)
    }

    /// Completed iterations since the last one that set a new best
    pub fn trailing_without_improvement(&self) -> usize {
        self.entries.iter().rev().take_while(|m| !m.new_best).count()
    }

    /// Wall time between the first and last completed iterations
    pub fn elapsed(&self) -> Option<Duration> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some(last.timestamp - first.timestamp)
    }

    pub fn summaries(&self) -> Vec<IterationSummary> {
        self.entries.iter().map(IterationMetrics::summary).collect()
    }
}
