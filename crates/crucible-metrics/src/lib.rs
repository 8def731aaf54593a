//! # crucible-metrics
//!
//! Per-iteration outcomes of a Crucible run.
//!
//! Every completed iteration produces one [`IterationMetrics`] holding the
//! six phase outputs and the scores derived from them. The [`MetricsHistory`]
//! keeps them in execution order and never rewrites an entry; stop criteria
//! and the final [`RunReport`] both read from it.

mod history;
mod report;

pub use history::{IterationMetrics, IterationSummary, MetricsHistory, PhaseOutputs};
pub use report::RunReport;
