//! The packaged result of a run, handed to the exporter

use crate::state_machine::StopReason;
use crucible_core::AgentUsage;
use crucible_metrics::{IterationSummary, PhaseOutputs, RunReport};
use serde::{Deserialize, Serialize};

/// The four deliverables of an iteration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    pub architecture: String,
    pub code: String,
    pub tests: String,
    pub documentation: String,
}

impl Artifacts {
    pub fn from_phases(phases: &PhaseOutputs) -> Self {
        Self {
            architecture: phases.architecture.content.clone(),
            code: phases.development.content.clone(),
            tests: phases.testing.content.clone(),
            documentation: phases.documentation.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionStatus {
    Success,
    Failed,
}

impl SolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a run
///
/// `status` is `Success` whenever some iteration produced a best bundle,
/// even if the loop then stopped on stagnation or budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolutionStatus,
    /// Winning iteration index, 0 when none
    pub iteration: usize,
    /// Best overall score
    pub score: f64,
    pub artifacts: Artifacts,
    /// Per-iteration summaries in execution order
    pub metrics: Vec<IterationSummary>,
    pub stop_reason: StopReason,
    /// Iterations attempted, including abandoned ones
    pub iterations_run: usize,
    pub agents: Vec<AgentUsage>,
    /// Seconds between the first and last completed iterations
    pub elapsed_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Solution {
    pub fn is_success(&self) -> bool {
        self.status == SolutionStatus::Success
    }

    /// Plain-text summary of the run
    pub fn report<'a>(&'a self, project: &'a str) -> RunReport<'a> {
        RunReport {
            project,
            status: self.status.as_str(),
            stop_reason: self.stop_reason.as_str(),
            best_iteration: self.iteration,
            best_score: self.score,
            elapsed_secs: self.elapsed_secs,
            iterations: &self.metrics,
            agents: &self.agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> Solution {
        Solution {
            status: SolutionStatus::Failed,
            iteration: 0,
            score: 0.0,
            artifacts: Artifacts::default(),
            metrics: Vec::new(),
            stop_reason: StopReason::IterationBudgetExhausted,
            iterations_run: 3,
            agents: Vec::new(),
            elapsed_secs: 0.0,
            error: Some("no iteration produced a solution".into()),
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(failed()).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["stop_reason"], "iteration_budget_exhausted");
        assert_eq!(json["artifacts"]["code"], "");
        assert!(json["metrics"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_error_omitted_on_success() {
        let mut solution = failed();
        solution.status = SolutionStatus::Success;
        solution.error = None;
        let json = serde_json::to_string(&solution).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(solution.is_success());
    }

    #[test]
    fn test_report_uses_stop_reason() {
        let solution = failed();
        let text = solution.report("demo").to_string();
        assert!(text.contains("Status:           failed"));
        assert!(text.contains("Stop reason:      iteration budget exhausted"));
    }
}
