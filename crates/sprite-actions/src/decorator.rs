//! Decorator actions.
//!
//! [`Repeat`] wraps a child and restarts it while a predicate allows it.

use crate::action::{Action, Lifecycle};
use crate::error::ActionError;
use crate::state::{ActionState, StopReason};
use crate::target::{TargetId, TargetStore};

type Factory = Box<dyn FnMut() -> Box<dyn Action>>;
type RepeatPredicate = Box<dyn FnMut(u32) -> bool>;

/// Repeats a child while `predicate(completed_iterations)` holds.
///
/// # Semantics
///
/// - The first iteration starts unconditionally when the repeat starts
/// - Each time the child finishes as `Done`, the completed count goes up by
///   one and the predicate is asked whether to run another iteration
/// - A cancelled iteration cancels the repeat with the same reason
///
/// Every iteration is a new child built by the factory, so stateful
/// conditions never carry counters over from a previous iteration.
pub struct Repeat {
    factory: Factory,
    predicate: RepeatPredicate,
    child: Option<Box<dyn Action>>,
    completed: u32,
    lifecycle: Lifecycle,
}

impl Repeat {
    pub fn new(
        factory: impl FnMut() -> Box<dyn Action> + 'static,
        predicate: impl FnMut(u32) -> bool + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            predicate: Box::new(predicate),
            child: None,
            completed: 0,
            lifecycle: Lifecycle::new("repeat"),
        }
    }

    /// Repeats until stopped.
    pub fn forever(factory: impl FnMut() -> Box<dyn Action> + 'static) -> Self {
        Self::new(factory, |_| true)
    }

    /// Runs the child `n` times. The first iteration always runs, so `0`
    /// behaves like `1`.
    pub fn times(n: u32, factory: impl FnMut() -> Box<dyn Action> + 'static) -> Self {
        Self::new(factory, move |completed| completed < n)
    }

    #[must_use]
    pub fn on_stop(mut self, on_stop: impl FnOnce(StopReason) + 'static) -> Self {
        self.lifecycle.set_on_stop(Box::new(on_stop));
        self
    }

    /// Number of iterations that finished as `Done`.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn child(&self) -> Option<&dyn Action> {
        self.child.as_deref()
    }

    fn spawn(&mut self) -> Result<(), ActionError> {
        let mut child = (self.factory)();
        child.start()?;
        self.child = Some(child);
        Ok(())
    }
}

impl Action for Repeat {
    fn name(&self) -> &'static str {
        self.lifecycle.name()
    }

    fn state(&self) -> ActionState {
        self.lifecycle.state()
    }

    fn elapsed(&self) -> f32 {
        self.lifecycle.elapsed()
    }

    fn stop_reason(&self) -> Option<StopReason> {
        self.lifecycle.stop_reason()
    }

    fn touches(&self, target: TargetId) -> bool {
        self.child.as_ref().is_some_and(|child| child.touches(target))
    }

    fn start(&mut self) -> Result<(), ActionError> {
        self.lifecycle.start()?;
        self.completed = 0;
        self.spawn()
    }

    fn update(&mut self, targets: &mut dyn TargetStore, dt: f32) -> Result<(), ActionError> {
        if !self.lifecycle.begin_update()? {
            return Ok(());
        }
        self.lifecycle.advance(dt);

        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        child.update(targets, dt)?;

        match child.state() {
            ActionState::Done => {
                self.completed += 1;
                if (self.predicate)(self.completed) {
                    self.spawn()?;
                } else {
                    self.lifecycle.finish(StopReason::Completed);
                }
            }
            ActionState::Cancelled => {
                let reason = child.stop_reason().unwrap_or(StopReason::Cancelled);
                self.lifecycle.finish(reason);
            }
            _ => {}
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), ActionError> {
        self.lifecycle.pause()?;
        match self.child.as_mut() {
            Some(child) if child.state().is_active() => child.pause(),
            _ => Ok(()),
        }
    }

    fn resume(&mut self) -> Result<(), ActionError> {
        self.lifecycle.resume()?;
        match self.child.as_mut() {
            Some(child) if child.state().is_active() => child.resume(),
            _ => Ok(()),
        }
    }

    fn stop_with(&mut self, reason: StopReason) {
        if self.lifecycle.state().is_terminal() {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            child.stop_with(reason);
        }
        self.lifecycle.finish(reason);
    }
}

impl Drop for Repeat {
    fn drop(&mut self) {
        self.stop_with(StopReason::Cancelled);
    }
}
