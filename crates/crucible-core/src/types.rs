//! Core type definitions shared across the Crucible crates

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The six roles of the generation pipeline, in phase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Architect,
    Developer,
    Reviewer,
    Security,
    Tester,
    Documentation,
}

impl Role {
    /// All roles in the order their phases run within an iteration
    pub const ALL: [Role; 6] = [
        Role::Architect,
        Role::Developer,
        Role::Reviewer,
        Role::Security,
        Role::Tester,
        Role::Documentation,
    ];

    /// Default backend model for this role
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Architect => "mistral",
            Self::Developer => "codellama",
            Self::Reviewer => "deepseek-coder",
            Self::Security => "mistral",
            Self::Tester => "qwen2.5-coder",
            Self::Documentation => "mistral",
        }
    }

    /// Default sampling temperature for this role
    ///
    /// Creative roles run hot, code generation cooler, and the security
    /// audit coolest.
    pub fn default_temperature(&self) -> f32 {
        match self {
            Self::Architect | Self::Documentation => 0.7,
            Self::Developer | Self::Reviewer | Self::Tester => 0.5,
            Self::Security => 0.3,
        }
    }

    /// Human-readable role title for logs and reports
    pub fn title(&self) -> &'static str {
        match self {
            Self::Architect => "Architect",
            Self::Developer => "Developer",
            Self::Reviewer => "Reviewer",
            Self::Security => "Security",
            Self::Tester => "Tester",
            Self::Documentation => "Documentation",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Architect => write!(f, "architect"),
            Self::Developer => write!(f, "developer"),
            Self::Reviewer => write!(f, "reviewer"),
            Self::Security => write!(f, "security"),
            Self::Tester => write!(f, "tester"),
            Self::Documentation => write!(f, "documentation"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "architect" => Ok(Self::Architect),
            "developer" => Ok(Self::Developer),
            "reviewer" => Ok(Self::Reviewer),
            "security" => Ok(Self::Security),
            "tester" => Ok(Self::Tester),
            "documentation" | "docs" => Ok(Self::Documentation),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Sampling parameters for a single generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParameters {
    /// Backend model identifier
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl SamplingParameters {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            top_p: 0.9,
            top_k: 40,
        }
    }

    /// Defaults for a role: its default model and temperature
    pub fn for_role(role: Role) -> Self {
        Self::new(role.default_model(), role.default_temperature())
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Bounded retry with exponential backoff
///
/// Pure configuration: the gateway derives every delay from these three
/// values and keeps no retry state between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after every further failure
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: initial_delay.as_millis() as u64,
            backoff_multiplier,
        }
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    /// Delay to wait after `failed_attempt` (1-based) before the next one
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Every inter-attempt delay this policy can produce, in order
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(move |attempt| self.delay_after(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Structured result of one agent invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Which agent produced this output
    pub role: Role,
    /// True when the backend returned non-empty text
    pub success: bool,
    /// Raw generated text (empty on soft failure)
    pub content: String,
    /// Score in [0, 100], when the role produces one
    pub score: Option<f64>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Approximate tokens spent on this call (prompt + response)
    pub token_count: usize,
}

impl AgentOutput {
    /// Output for roles whose score is just the success flag (100 or 0)
    pub fn from_content(role: Role, content: String, token_count: usize) -> Self {
        let success = !content.trim().is_empty();
        Self {
            role,
            success,
            content,
            score: Some(if success { 100.0 } else { 0.0 }),
            issues: Vec::new(),
            recommendations: Vec::new(),
            token_count,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score.clamp(0.0, 100.0));
        self
    }

    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }

    /// Score, or 0 when absent
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// Lifetime usage counters of one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentUsage {
    pub role: Role,
    pub model: String,
    pub call_count: u64,
    pub estimated_tokens: u64,
}

impl std::fmt::Display for AgentUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) - {} calls, {} tokens",
            self.role.title(),
            self.model,
            self.call_count,
            format_tokens(self.estimated_tokens)
        )
    }
}

/// Format a token count compactly (950, 12.3K, 1.2M)
pub fn format_tokens(count: u64) -> String {
    if count < 1_000 {
        count.to_string()
    } else if count < 1_000_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    }
}
