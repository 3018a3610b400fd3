//! Error types for the action engine.
//!
//! Only structural misuse is an error: calling an operation from a state that
//! forbids it. Runtime conditions such as a vanished target are not errors;
//! the affected action cancels itself and reports
//! [`StopReason::TargetGone`](crate::StopReason::TargetGone) instead.

use crate::scheduler::ActionId;
use crate::state::ActionState;

/// Lifecycle operation that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Start,
    Update,
    Pause,
    Resume,
}

/// Errors raised by an individual action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The operation is not allowed from the action's current state.
    ///
    /// This always indicates a caller bug (e.g., starting an action twice or
    /// updating one that already finished) and is never retried.
    #[error("{action}: cannot {operation} while {state}")]
    InvalidState {
        action: &'static str,
        operation: Operation,
        state: ActionState,
    },
}

impl ActionError {
    pub(crate) fn invalid(action: &'static str, operation: Operation, state: ActionState) -> Self {
        Self::InvalidState {
            action,
            operation,
            state,
        }
    }

    /// Returns the state the action was in when the error was raised.
    pub fn state(&self) -> ActionState {
        match self {
            Self::InvalidState { state, .. } => *state,
        }
    }
}

/// Errors raised by the [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Only pending actions may be scheduled or bound.
    #[error("{action} must be pending to be scheduled (found {state})")]
    NotPending {
        action: &'static str,
        state: ActionState,
    },

    /// No active action has this id.
    #[error("no active action with id {0}")]
    UnknownAction(ActionId),

    #[error(transparent)]
    Action(#[from] ActionError),
}
