//! # crucible-orchestrator
//!
//! The Crucible iteration loop.
//!
//! This crate provides:
//! - A pure stop-criteria state machine (no I/O, never panics)
//! - Weighted fusion of phase outputs into one overall score
//! - [`OrchestrationState`], which keeps the best bundle across iterations
//! - The [`Orchestrator`] that runs the six phases per iteration
//! - [`Solution`], the packaged result handed to exporters
//!
//! ## Key Pattern
//!
//! Every iteration starts from the requirements alone; nothing but the best
//! bundle and the metrics history survives between iterations. A failing
//! iteration is discarded without touching either.

mod cancel;
mod orchestrator;
mod scoring;
mod solution;
mod state;
mod state_machine;

pub use cancel::CancelHandle;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use scoring::ScoreWeights;
pub use solution::{Artifacts, Solution, SolutionStatus};
pub use state::{BestSolution, OrchestrationState};
pub use state_machine::{
    transition, Action, Event, IterationOutcome, State, StopCriteria, StopReason,
    STAGNATION_WINDOW,
};
