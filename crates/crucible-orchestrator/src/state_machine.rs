//! Pure state machine for the iteration loop
//!
//! This module has NO I/O and no async. Every transition is a deterministic
//! function of the current state, the event, and the stop criteria:
//! `transition(state, event, criteria) -> (state, actions)`.
//!
//! - `Idle -> Running(1) -> Running(k+1) | Stopped(reason)`
//! - `Stopped` is terminal; there are no backward transitions
//! - Invalid transitions go to `Failed` (never panic)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// An iteration's overall score met the quality threshold
    ThresholdReached,
    /// Three consecutive iterations without a new best
    Stagnation,
    /// The last allowed iteration index was reached
    IterationBudgetExhausted,
    /// The caller asked the loop to stop
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThresholdReached => "threshold reached",
            Self::Stagnation => "stagnation",
            Self::IterationBudgetExhausted => "iteration budget exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consecutive non-improving iterations that count as stagnation
pub const STAGNATION_WINDOW: usize = 3;

/// Limits the loop is evaluated against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopCriteria {
    pub max_iterations: usize,
    pub quality_threshold: f64,
}

impl StopCriteria {
    /// Evaluate the stop rules after a completed iteration, in precedence order
    pub fn evaluate(&self, iteration: usize, outcome: &IterationOutcome) -> Option<StopReason> {
        if outcome.overall_score >= self.quality_threshold {
            return Some(StopReason::ThresholdReached);
        }
        if outcome.history_len >= STAGNATION_WINDOW
            && outcome.trailing_without_improvement >= STAGNATION_WINDOW
        {
            return Some(StopReason::Stagnation);
        }
        self.budget_check(iteration)
    }

    /// Only the budget applies after an abandoned iteration
    pub fn budget_check(&self, iteration: usize) -> Option<StopReason> {
        (iteration >= self.max_iterations).then_some(StopReason::IterationBudgetExhausted)
    }
}

/// What the stop rules need to know about a completed iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationOutcome {
    pub overall_score: f64,
    /// History length including this iteration
    pub history_len: usize,
    /// Trailing history entries that did not set a new best
    pub trailing_without_improvement: usize,
}

/// Loop state
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// No run in progress
    Idle,
    /// Iteration `iteration` is executing
    Running { iteration: usize },
    /// Run finished; `iteration` is the last index attempted
    Stopped { reason: StopReason, iteration: usize },
    /// Invalid transition
    Failed { error: String },
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Stopped { .. } | State::Failed { .. })
    }
}

/// Events that drive the loop
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    IterationCompleted(IterationOutcome),
    /// The iteration raised an error and was abandoned
    IterationAbandoned { error: String },
    CancelRequested,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Execute the six phases for this iteration index
    RunIteration { iteration: usize },
    LogActivity { message: String },
    /// Package the result
    Finish { reason: StopReason },
}

/// Pure state transition function
///
/// Takes the current state and an event, returns the new state and the
/// actions to execute. Never panics.
pub fn transition(state: State, event: Event, criteria: &StopCriteria) -> (State, Vec<Action>) {
    match (state, event) {
        (State::Idle, Event::Start) => {
            if criteria.max_iterations == 0 {
                return (
                    State::Failed {
                        error: "max_iterations must be at least 1".to_string(),
                    },
                    vec![],
                );
            }
            (
                State::Running { iteration: 1 },
                vec![
                    Action::LogActivity {
                        message: format!(
                            "Starting run: up to {} iterations, threshold {:.1}",
                            criteria.max_iterations, criteria.quality_threshold
                        ),
                    },
                    Action::RunIteration { iteration: 1 },
                ],
            )
        }

        (State::Running { iteration }, Event::IterationCompleted(outcome)) => {
            match criteria.evaluate(iteration, &outcome) {
                Some(reason) => stop(iteration, reason),
                None => advance(iteration),
            }
        }

        (State::Running { iteration }, Event::IterationAbandoned { error }) => {
            let mut actions = vec![Action::LogActivity {
                message: format!("Iteration {} abandoned: {}", iteration, error),
            }];
            let (next, more) = match criteria.budget_check(iteration) {
                Some(reason) => stop(iteration, reason),
                None => advance(iteration),
            };
            actions.extend(more);
            (next, actions)
        }

        // Cancellation is observed before `iteration` starts
        (State::Running { iteration }, Event::CancelRequested) => {
            stop(iteration.saturating_sub(1), StopReason::Cancelled)
        }

        // Cancelling before the first iteration stops at index 0
        (State::Idle, Event::CancelRequested) => stop(0, StopReason::Cancelled),

        (State::Stopped { reason, iteration }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from Stopped ({} at iteration {}) on event: {:?}",
                    reason, iteration, event
                ),
            },
            vec![],
        ),

        (State::Failed { error }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from Failed state (error: {}) on event: {:?}",
                    error, event
                ),
            },
            vec![],
        ),

        (state, event) => (
            State::Failed {
                error: format!(
                    "Invalid state transition: {:?} cannot handle event {:?}",
                    state, event
                ),
            },
            vec![],
        ),
    }
}

fn advance(iteration: usize) -> (State, Vec<Action>) {
    let next = iteration + 1;
    (
        State::Running { iteration: next },
        vec![Action::RunIteration { iteration: next }],
    )
}

fn stop(iteration: usize, reason: StopReason) -> (State, Vec<Action>) {
    (
        State::Stopped { reason, iteration },
        vec![
            Action::LogActivity {
                message: format!("Stopping after iteration {}: {}", iteration, reason),
            },
            Action::Finish { reason },
        ],
    )
}
