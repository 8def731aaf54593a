//! # crucible-core
//!
//! Core types for the Crucible multi-agent generation loop.
//!
//! Crucible runs six role agents (architect, developer, reviewer, security,
//! tester, documentation) against a local text-generation backend, scores
//! every pass, and keeps the best artifact bundle it has seen.
//!
//! This crate holds what every other crate agrees on:
//! - the error type and `Result` alias
//! - roles, sampling parameters and the retry policy
//! - the uniform `AgentOutput` record
//! - `crucible.toml` configuration

pub mod config;
mod error;
mod types;

pub use config::{
    BackendConfig, CrucibleConfig, ModelConfig, PromptLimits, RunConfig, SamplingConfig,
};
pub use error::{CrucibleError, Result};
pub use types::*;
