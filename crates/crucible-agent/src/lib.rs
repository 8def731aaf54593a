//! # crucible-agent
//!
//! Generation gateway and role agents for Crucible.
//!
//! This crate provides:
//! - A retrying [`Gateway`] in front of a [`GenerationBackend`] (Ollama over HTTP)
//! - The [`ExtractionPolicy`] that turns replies into scores and lists
//! - The [`Agent`] capability and its six roles, grouped in an [`AgentRoster`]
//!
//! ## Key Pattern
//!
//! Every agent call is fresh: one prompt built from the current iteration's
//! artifacts, one backend request, no conversation history. A backend that
//! keeps failing degrades to empty text instead of an error, so a single bad
//! phase lowers the iteration's score rather than aborting the run.

mod agent;
mod backend;
mod extract;
mod gateway;
pub mod prompt;
mod roles;
mod types;

pub use agent::{estimate_tokens, Agent, AgentContext, AgentCounters, PhaseInput};
pub use backend::{ChunkStream, GenerationBackend, OllamaBackend};
pub use extract::{ExtractionPolicy, STANDARD_SCORE_PATTERNS};
pub use gateway::Gateway;
pub use roles::{
    AgentRoster, ArchitectAgent, DeveloperAgent, DocumentationAgent, ReviewerAgent,
    SecurityAgent, TesterAgent,
};
pub use types::*;
