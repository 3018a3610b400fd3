//! Lifecycle states and stop reasons shared by every action.

/// The lifecycle state of an action.
///
/// ```text
/// Pending --start()--> Running --pause()--> Paused --resume()--> Running
/// Pending | Running | Paused --stop()--> Cancelled
/// Running --condition satisfied--> Done
/// ```
///
/// `Done` and `Cancelled` are terminal: nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionState {
    /// Constructed but not started yet.
    Pending,

    /// Advancing every frame.
    Running,

    /// Suspended; updates are legal no-ops and do not advance elapsed time.
    Paused,

    /// The completion condition was satisfied.
    Done,

    /// Stopped before completing (see [`StopReason`]).
    Cancelled,
}

impl ActionState {
    /// Returns `true` for `Done` and `Cancelled`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionState::Done | ActionState::Cancelled)
    }

    /// Returns `true` for `Running` and `Paused`.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, ActionState::Running | ActionState::Paused)
    }
}

/// Why an action reached a terminal state.
///
/// `Completed` accompanies [`ActionState::Done`]; every other reason
/// accompanies [`ActionState::Cancelled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StopReason {
    /// The completion condition was satisfied.
    Completed,

    /// Explicitly stopped by the host or by a cancelled parent.
    Cancelled,

    /// Evicted by a newer action bound to the same `(target, tag)` pair.
    Replaced,

    /// The target no longer exists in the target store.
    TargetGone,

    /// Isolated by the scheduler after a structural error during update.
    Faulted,
}

impl StopReason {
    /// The terminal state this reason leads to.
    #[inline]
    pub fn terminal_state(self) -> ActionState {
        match self {
            StopReason::Completed => ActionState::Done,
            _ => ActionState::Cancelled,
        }
    }
}
