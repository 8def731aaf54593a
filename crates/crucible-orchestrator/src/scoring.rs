//! Weighted fusion of phase outputs into one overall score

use crucible_core::AgentOutput;

/// Weight of each signal in the overall score; the four sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub review: f64,
    pub security: f64,
    pub tests_present: f64,
    pub docs_present: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            review: 0.35,
            security: 0.25,
            tests_present: 0.20,
            docs_present: 0.20,
        }
    }
}

impl ScoreWeights {
    /// Fuse review and security scores with the tester and documentation
    /// success flags, clamped to [0, 100]
    pub fn fuse(
        &self,
        review: &AgentOutput,
        security: &AgentOutput,
        testing: &AgentOutput,
        documentation: &AgentOutput,
    ) -> f64 {
        let presence = |output: &AgentOutput| if output.success { 100.0 } else { 0.0 };

        let overall = review.score_or_zero() * self.review
            + security.score_or_zero() * self.security
            + presence(testing) * self.tests_present
            + presence(documentation) * self.docs_present;

        overall.clamp(0.0, 100.0)
    }
}
