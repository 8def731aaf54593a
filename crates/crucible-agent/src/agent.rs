//! The agent capability shared by all six roles
//!
//! An agent turns the artifacts of earlier phases into one prompt, makes one
//! gateway call, and parses the reply into an [`AgentOutput`]. Agents keep
//! no conversation history; the only state they carry is a pair of
//! lifetime counters (calls made, tokens spent).

use crate::extract::ExtractionPolicy;
use crate::gateway::Gateway;
use async_trait::async_trait;
use crucible_core::{AgentOutput, AgentUsage, PromptLimits, Result, Role, SamplingParameters};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Everything a phase may consume; each role reads only what it needs
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseInput<'a> {
    pub requirements: &'a str,
    /// Architect output of the current iteration
    pub architecture: &'a str,
    /// Developer output of the current iteration
    pub code: &'a str,
    /// Language the developer writes in
    pub language: &'a str,
    /// 1-based iteration index
    pub iteration: usize,
}

/// A role-specific generation capability
#[async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> Role;

    /// Build the role's prompt, call the backend once, parse the reply
    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput>;

    /// Lifetime call and token counters
    fn usage(&self) -> AgentUsage;
}

/// Collaborators shared by every agent of a run
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub gateway: Arc<Gateway>,
    pub limits: PromptLimits,
    pub extraction: Arc<ExtractionPolicy>,
}

impl AgentContext {
    pub fn new(gateway: Arc<Gateway>, limits: PromptLimits) -> Self {
        Self {
            gateway,
            limits,
            extraction: Arc::new(ExtractionPolicy::default()),
        }
    }

    pub fn with_extraction(mut self, extraction: ExtractionPolicy) -> Self {
        self.extraction = Arc::new(extraction);
        self
    }
}

/// Monotonic per-agent counters
#[derive(Debug, Default)]
pub struct AgentCounters {
    calls: AtomicU64,
    tokens: AtomicU64,
}

impl AgentCounters {
    pub fn record(&self, tokens: u64) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.tokens.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn tokens(&self) -> u64 {
        self.tokens.load(Ordering::Relaxed)
    }
}

/// Approximate token count: about four characters per token
pub fn estimate_tokens(prompt: &str, response: &str) -> usize {
    prompt.chars().count() / 4 + response.chars().count() / 4
}

/// Shared machinery behind every role: parameters, counters, the gateway call
#[derive(Debug)]
pub(crate) struct AgentCore {
    role: Role,
    params: SamplingParameters,
    pub(crate) context: AgentContext,
    counters: AgentCounters,
}

impl AgentCore {
    pub(crate) fn new(role: Role, params: SamplingParameters, context: AgentContext) -> Self {
        Self {
            role,
            params,
            context,
            counters: AgentCounters::default(),
        }
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn limits(&self) -> &PromptLimits {
        &self.context.limits
    }

    pub(crate) fn extraction(&self) -> &ExtractionPolicy {
        &self.context.extraction
    }

    /// One gateway call; returns the (possibly empty) text and its token estimate
    pub(crate) async fn call(&self, prompt: &str, iteration: usize) -> (String, usize) {
        debug!(
            "[{}] call #{} with {} (iteration {}, {} chars)",
            self.role.title(),
            self.counters.calls() + 1,
            self.params.model,
            iteration,
            prompt.len()
        );

        let response = self.context.gateway.generate(prompt, &self.params).await;
        let tokens = estimate_tokens(prompt, &response);
        self.counters.record(tokens as u64);

        (response, tokens)
    }

    pub(crate) fn usage(&self) -> AgentUsage {
        AgentUsage {
            role: self.role,
            model: self.params.model.clone(),
            call_count: self.counters.calls(),
            estimated_tokens: self.counters.tokens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("abcdefgh", "abcd"), 3);
        assert_eq!(estimate_tokens("abc", ""), 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let counters = AgentCounters::default();
        counters.record(10);
        counters.record(0);
        counters.record(5);
        assert_eq!(counters.calls(), 3);
        assert_eq!(counters.tokens(), 15);
    }
}
