//! Plain-text run summary

use crate::history::IterationSummary;
use crucible_core::{format_tokens, AgentUsage};
use std::fmt;

/// Summary of a finished run, rendered with `Display`
#[derive(Debug, Clone)]
pub struct RunReport<'a> {
    pub project: &'a str,
    pub status: &'a str,
    pub stop_reason: &'a str,
    pub best_iteration: usize,
    pub best_score: f64,
    pub elapsed_secs: f64,
    pub iterations: &'a [IterationSummary],
    pub agents: &'a [AgentUsage],
}

impl fmt::Display for RunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CRUCIBLE RUN REPORT")?;
        writeln!(f, "===================")?;
        writeln!(f, "Project:          {}", self.project)?;
        writeln!(f, "Status:           {}", self.status)?;
        writeln!(f, "Stop reason:      {}", self.stop_reason)?;
        writeln!(f, "Iterations:       {}", self.iterations.len())?;
        if self.best_iteration > 0 {
            writeln!(
                f,
                "Best score:       {:.1} (iteration {})",
                self.best_score, self.best_iteration
            )?;
        } else {
            writeln!(f, "Best score:       none")?;
        }
        writeln!(f, "Elapsed:          {:.1}s", self.elapsed_secs)?;

        if !self.iterations.is_empty() {
            writeln!(f)?;
            writeln!(f, "ITERATIONS")?;
            writeln!(
                f,
                "{:>4}  {:>7}  {:>6}  {:>8}  {:>6}  {:>4}",
                "#", "overall", "review", "security", "issues", "best"
            )?;
            for it in self.iterations {
                writeln!(
                    f,
                    "{:>4}  {:>7.1}  {:>6.1}  {:>8.1}  {:>6}  {:>4}",
                    it.iteration,
                    it.overall_score,
                    it.reviewer_score,
                    it.security_score,
                    it.issues_count,
                    if it.new_best { "*" } else { "" }
                )?;
            }
        }

        if !self.agents.is_empty() {
            writeln!(f)?;
            writeln!(f, "AGENTS")?;
            for usage in self.agents {
                writeln!(f, "  {}", usage)?;
            }
            let total: u64 = self.agents.iter().map(|u| u.estimated_tokens).sum();
            writeln!(f, "  total tokens: {}", format_tokens(total))?;
        }

        if let Some(last) = self.iterations.last() {
            if !last.improvements.is_empty() {
                writeln!(f)?;
                writeln!(f, "OPEN IMPROVEMENTS (iteration {})", last.iteration)?;
                for item in &last.improvements {
                    writeln!(f, "  - {}", item)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::phases;
    use crate::history::IterationMetrics;
    use crucible_core::Role;

    #[test]
    fn test_report_renders_table_and_agents() {
        let iterations = vec![
            IterationMetrics::new(1, phases(70.0, 80.0), 84.5, true).summary(),
            IterationMetrics::new(2, phases(60.0, 80.0), 80.0, false).summary(),
        ];
        let agents = vec![AgentUsage {
            role: Role::Reviewer,
            model: "codellama".into(),
            call_count: 2,
            estimated_tokens: 1500,
        }];

        let text = RunReport {
            project: "todo-api",
            status: "success",
            stop_reason: "iteration budget exhausted",
            best_iteration: 1,
            best_score: 84.5,
            elapsed_secs: 12.0,
            iterations: &iterations,
            agents: &agents,
        }
        .to_string();

        assert!(text.contains("Project:          todo-api"));
        assert!(text.contains("Best score:       84.5 (iteration 1)"));
        assert!(text.contains("total tokens: 1.5K"));
        assert!(text.contains("  - escape output"));
        assert_eq!(text.lines().filter(|l| l.ends_with('*')).count(), 1);
    }

    #[test]
    fn test_report_without_iterations() {
        let text = RunReport {
            project: "empty",
            status: "failed",
            stop_reason: "iteration budget exhausted",
            best_iteration: 0,
            best_score: 0.0,
            elapsed_secs: 0.0,
            iterations: &[],
            agents: &[],
        }
        .to_string();

        assert!(text.contains("Best score:       none"));
        assert!(!text.contains("ITERATIONS"));
    }
}
