//! Core action trait.
//!
//! This module defines the [`Action`] trait, the single interface shared by
//! atomic behaviors and composites, and [`Lifecycle`], the state machine every
//! implementation embeds so the transition rules live in one place.

use crate::condition::Progress;
use crate::error::{ActionError, Operation};
use crate::state::{ActionState, StopReason};
use crate::target::{TargetId, TargetStore};

/// Callback invoked once when an action reaches a terminal state.
pub type OnStop = Box<dyn FnOnce(StopReason)>;

/// A schedulable, frame-driven behavior.
///
/// The scheduler cannot tell atomic behaviors and composites apart; both are
/// driven exclusively through this trait.
pub trait Action {
    /// Short static name used in errors and debug records.
    fn name(&self) -> &'static str;

    fn state(&self) -> ActionState;

    /// Accumulated non-paused `dt` since start, in reference frames.
    fn elapsed(&self) -> f32;

    /// Why the action stopped, once it is terminal.
    fn stop_reason(&self) -> Option<StopReason>;

    /// The target this action writes to. Composites return `None`.
    fn target(&self) -> Option<TargetId> {
        None
    }

    /// Returns true if this action (or any of its children) writes to `target`.
    fn touches(&self, target: TargetId) -> bool {
        self.target() == Some(target)
    }

    /// Transitions `Pending -> Running`.
    fn start(&mut self) -> Result<(), ActionError>;

    /// Advances the action by `dt` reference frames.
    ///
    /// Legal no-op while paused. Updating a pending or terminal action is an
    /// [`ActionError::InvalidState`].
    fn update(&mut self, targets: &mut dyn TargetStore, dt: f32) -> Result<(), ActionError>;

    /// Transitions `Running -> Paused`. No-op if already paused.
    fn pause(&mut self) -> Result<(), ActionError>;

    /// Transitions `Paused -> Running`. No-op if already running.
    fn resume(&mut self) -> Result<(), ActionError>;

    /// Cancels the action with `reason`. No-op on terminal actions.
    fn stop_with(&mut self, reason: StopReason);

    /// Cancels the action. Calling this any number of times fires `on_stop`
    /// at most once.
    fn stop(&mut self) {
        self.stop_with(StopReason::Cancelled);
    }

    fn is_done(&self) -> bool {
        self.state().is_terminal()
    }
}

/// Blanket implementation for boxed actions.
///
/// This allows `Box<dyn Action>` to also implement `Action`, enabling dynamic
/// dispatch and heterogeneous collections of children.
impl Action for Box<dyn Action> {
    #[inline]
    fn name(&self) -> &'static str {
        (**self).name()
    }

    #[inline]
    fn state(&self) -> ActionState {
        (**self).state()
    }

    #[inline]
    fn elapsed(&self) -> f32 {
        (**self).elapsed()
    }

    #[inline]
    fn stop_reason(&self) -> Option<StopReason> {
        (**self).stop_reason()
    }

    #[inline]
    fn target(&self) -> Option<TargetId> {
        (**self).target()
    }

    #[inline]
    fn touches(&self, target: TargetId) -> bool {
        (**self).touches(target)
    }

    #[inline]
    fn start(&mut self) -> Result<(), ActionError> {
        (**self).start()
    }

    #[inline]
    fn update(&mut self, targets: &mut dyn TargetStore, dt: f32) -> Result<(), ActionError> {
        (**self).update(targets, dt)
    }

    #[inline]
    fn pause(&mut self) -> Result<(), ActionError> {
        (**self).pause()
    }

    #[inline]
    fn resume(&mut self) -> Result<(), ActionError> {
        (**self).resume()
    }

    #[inline]
    fn stop_with(&mut self, reason: StopReason) {
        (**self).stop_with(reason)
    }
}

/// State machine embedded by every [`Action`] implementation.
///
/// Owns the state, the elapsed-time bookkeeping and the single-shot
/// `on_stop` callback.
pub struct Lifecycle {
    name: &'static str,
    state: ActionState,
    elapsed: f32,
    frames: u32,
    stop_reason: Option<StopReason>,
    on_stop: Option<OnStop>,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: ActionState::Pending,
            elapsed: 0.0,
            frames: 0,
            stop_reason: None,
            on_stop: None,
        }
    }

    pub fn set_on_stop(&mut self, on_stop: OnStop) {
        self.on_stop = Some(on_stop);
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn state(&self) -> ActionState {
        self.state
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[inline]
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn start(&mut self) -> Result<(), ActionError> {
        if self.state != ActionState::Pending {
            return Err(ActionError::invalid(self.name, Operation::Start, self.state));
        }
        self.state = ActionState::Running;
        self.elapsed = 0.0;
        self.frames = 0;
        Ok(())
    }

    /// Checks whether an update may proceed.
    ///
    /// Returns `Ok(true)` when running, `Ok(false)` when paused (the update
    /// must be skipped entirely), and an error otherwise.
    pub fn begin_update(&self) -> Result<bool, ActionError> {
        match self.state {
            ActionState::Running => Ok(true),
            ActionState::Paused => Ok(false),
            state => Err(ActionError::invalid(self.name, Operation::Update, state)),
        }
    }

    /// Accounts for one update of `dt` and returns the resulting progress.
    pub fn advance(&mut self, dt: f32) -> Progress {
        self.elapsed += dt;
        self.frames += 1;
        Progress {
            elapsed: self.elapsed,
            frames: self.frames,
            dt,
        }
    }

    pub fn pause(&mut self) -> Result<(), ActionError> {
        match self.state {
            ActionState::Running | ActionState::Paused => {
                self.state = ActionState::Paused;
                Ok(())
            }
            state => Err(ActionError::invalid(self.name, Operation::Pause, state)),
        }
    }

    pub fn resume(&mut self) -> Result<(), ActionError> {
        match self.state {
            ActionState::Running | ActionState::Paused => {
                self.state = ActionState::Running;
                Ok(())
            }
            state => Err(ActionError::invalid(self.name, Operation::Resume, state)),
        }
    }

    /// Moves to the terminal state implied by `reason` and fires `on_stop`.
    ///
    /// Returns `false` (and does nothing) if already terminal.
    pub fn finish(&mut self, reason: StopReason) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = reason.terminal_state();
        self.stop_reason = Some(reason);
        if let Some(on_stop) = self.on_stop.take() {
            on_stop(reason);
        }
        true
    }
}
