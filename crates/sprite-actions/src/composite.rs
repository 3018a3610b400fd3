//! Composite actions.
//!
//! Composites own their children and drive them through the same [`Action`]
//! contract the scheduler uses, so a composite can be scheduled, bound, nested
//! and cancelled exactly like an atomic behavior.
//!
//! - [`Sequence`]: one child at a time, in list order
//! - [`Parallel`]: every child at once, done when all are terminal
//!
//! [`Repeat`](crate::Repeat) lives in the decorator module.
//!
//! Dropping a composite cancels every child that is still live.

use crate::action::{Action, Lifecycle};
use crate::error::ActionError;
use crate::state::{ActionState, StopReason};
use crate::target::{TargetId, TargetStore};

/// Runs child actions one after another.
///
/// # Semantics
///
/// - When the active child finishes as `Done`, the next child is started in
///   the same update and receives its first update on the next frame
/// - When the active child is cancelled, the sequence is cancelled with the
///   child's reason and the children that never started are cancelled too
/// - The sequence is `Done` when its last child is `Done`
pub struct Sequence {
    children: Vec<Box<dyn Action>>,
    current: usize,
    lifecycle: Lifecycle,
}

impl Sequence {
    /// Creates a new sequence with the given children.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty. A sequence with no children is
    /// meaningless and likely indicates a programming error.
    pub fn new(children: Vec<Box<dyn Action>>) -> Self {
        assert!(
            !children.is_empty(),
            "Sequence must have at least one child"
        );
        Self {
            children,
            current: 0,
            lifecycle: Lifecycle::new("sequence"),
        }
    }

    /// Registers a callback fired once when the sequence stops for any reason.
    #[must_use]
    pub fn on_stop(mut self, on_stop: impl FnOnce(StopReason) + 'static) -> Self {
        self.lifecycle.set_on_stop(Box::new(on_stop));
        self
    }

    /// Index of the child currently being driven.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn children(&self) -> &[Box<dyn Action>] {
        &self.children
    }
}

impl Action for Sequence {
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
        self.children.iter().any(|child| child.touches(target))
    }

    fn start(&mut self) -> Result<(), ActionError> {
        self.lifecycle.start()?;
        self.children[0].start()
    }

    fn update(&mut self, targets: &mut dyn TargetStore, dt: f32) -> Result<(), ActionError> {
        if !self.lifecycle.begin_update()? {
            return Ok(());
        }
        self.lifecycle.advance(dt);

        let child = &mut self.children[self.current];
        child.update(targets, dt)?;

        match child.state() {
            ActionState::Done => {
                self.current += 1;
                match self.children.get_mut(self.current) {
                    Some(next) => next.start()?,
                    None => {
                        self.current -= 1;
                        self.lifecycle.finish(StopReason::Completed);
                    }
                }
            }
            ActionState::Cancelled => {
                let reason = child.stop_reason().unwrap_or(StopReason::Cancelled);
                self.stop_with(reason);
            }
            _ => {}
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), ActionError> {
        self.lifecycle.pause()?;
        let child = &mut self.children[self.current];
        if child.state().is_active() {
            child.pause()?;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ActionError> {
        self.lifecycle.resume()?;
        let child = &mut self.children[self.current];
        if child.state().is_active() {
            child.resume()?;
        }
        Ok(())
    }

    fn stop_with(&mut self, reason: StopReason) {
        if self.lifecycle.state().is_terminal() {
            return;
        }
        for child in &mut self.children[self.current..] {
            child.stop_with(reason);
        }
        self.lifecycle.finish(reason);
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        self.stop_with(StopReason::Cancelled);
    }
}

/// Runs child actions simultaneously.
///
/// # Semantics
///
/// - All children start together
/// - Every frame, each child that is not yet terminal is updated, always in
///   list order
/// - The parallel is `Done` once every child is `Done` or `Cancelled`
pub struct Parallel {
    children: Vec<Box<dyn Action>>,
    lifecycle: Lifecycle,
}

impl Parallel {
    /// Creates a new parallel with the given children.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty.
    pub fn new(children: Vec<Box<dyn Action>>) -> Self {
        assert!(
            !children.is_empty(),
            "Parallel must have at least one child"
        );
        Self {
            children,
            lifecycle: Lifecycle::new("parallel"),
        }
    }

    #[must_use]
    pub fn on_stop(mut self, on_stop: impl FnOnce(StopReason) + 'static) -> Self {
        self.lifecycle.set_on_stop(Box::new(on_stop));
        self
    }

    pub fn children(&self) -> &[Box<dyn Action>] {
        &self.children
    }

    fn live_children(&mut self) -> impl Iterator<Item = &mut Box<dyn Action>> {
        self.children
            .iter_mut()
            .filter(|child| child.state().is_active())
    }
}

impl Action for Parallel {
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
        self.children.iter().any(|child| child.touches(target))
    }

    fn start(&mut self) -> Result<(), ActionError> {
        self.lifecycle.start()?;
        for child in &mut self.children {
            child.start()?;
        }
        Ok(())
    }

    fn update(&mut self, targets: &mut dyn TargetStore, dt: f32) -> Result<(), ActionError> {
        if !self.lifecycle.begin_update()? {
            return Ok(());
        }
        self.lifecycle.advance(dt);

        for child in self.live_children() {
            child.update(targets, dt)?;
        }

        if self.children.iter().all(|child| child.is_done()) {
            self.lifecycle.finish(StopReason::Completed);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), ActionError> {
        self.lifecycle.pause()?;
        for child in self.live_children() {
            child.pause()?;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ActionError> {
        self.lifecycle.resume()?;
        for child in self.live_children() {
            child.resume()?;
        }
        Ok(())
    }

    fn stop_with(&mut self, reason: StopReason) {
        if self.lifecycle.state().is_terminal() {
            return;
        }
        for child in &mut self.children {
            child.stop_with(reason);
        }
        self.lifecycle.finish(reason);
    }
}

impl Drop for Parallel {
    fn drop(&mut self) {
        self.stop_with(StopReason::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::{DelayUntil, MoveUntil};
    use crate::condition::{after_frames, infinite};
    use crate::target::{Sprite, SpriteArena, Vec2};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(&'static str, StopReason)>>>;

    fn delay(frames: u32, label: &'static str, log: &Log) -> Box<dyn Action> {
        let log = Rc::clone(log);
        DelayUntil::new(after_frames(frames))
            .on_stop(move |reason| log.borrow_mut().push((label, reason)))
            .boxed()
    }

    #[test]
    fn sequence_never_runs_two_children_at_once() {
        let mut arena = SpriteArena::new();
        let log = Log::default();
        let mut seq = Sequence::new(vec![delay(2, "a", &log), delay(1, "b", &log)]);
        seq.start().unwrap();

        seq.update(&mut arena, 1.0).unwrap();
        assert_eq!(seq.children()[0].state(), ActionState::Running);
        assert_eq!(seq.children()[1].state(), ActionState::Pending);

        seq.update(&mut arena, 1.0).unwrap();
        assert_eq!(seq.children()[0].state(), ActionState::Done);
        assert_eq!(seq.children()[1].state(), ActionState::Running);
        assert_eq!(seq.current_index(), 1);

        seq.update(&mut arena, 1.0).unwrap();
        assert_eq!(seq.state(), ActionState::Done);
        assert_eq!(
            *log.borrow(),
            vec![("a", StopReason::Completed), ("b", StopReason::Completed)]
        );
    }

    #[test]
    fn cancelled_child_cancels_sequence_and_pending_siblings() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let log = Log::default();
        let first = MoveUntil::new(ship, Vec2::X, infinite()).boxed();
        let mut seq = Sequence::new(vec![first, delay(1, "next", &log)]);
        seq.start().unwrap();

        arena.remove(ship);
        seq.update(&mut arena, 1.0).unwrap();

        assert_eq!(seq.state(), ActionState::Cancelled);
        assert_eq!(seq.stop_reason(), Some(StopReason::TargetGone));
        assert_eq!(*log.borrow(), vec![("next", StopReason::TargetGone)]);
    }

    #[test]
    fn parallel_waits_for_slowest_child() {
        let mut arena = SpriteArena::new();
        let log = Log::default();
        let mut par = Parallel::new(vec![
            delay(1, "fast", &log),
            delay(3, "slow", &log),
            delay(2, "mid", &log),
        ]);
        par.start().unwrap();

        par.update(&mut arena, 1.0).unwrap();
        par.update(&mut arena, 1.0).unwrap();
        assert_eq!(par.state(), ActionState::Running);
        par.update(&mut arena, 1.0).unwrap();
        assert_eq!(par.state(), ActionState::Done);

        let order: Vec<_> = log.borrow().iter().map(|(label, _)| *label).collect();
        assert_eq!(order, vec!["fast", "mid", "slow"]);
    }

    #[test]
    fn stopping_parallel_cancels_live_children_once() {
        let log = Log::default();
        let mut arena = SpriteArena::new();
        let mut par = Parallel::new(vec![delay(1, "done", &log), delay(5, "live", &log)]);
        par.start().unwrap();
        par.update(&mut arena, 1.0).unwrap();

        par.stop();
        par.stop();

        assert_eq!(par.state(), ActionState::Cancelled);
        assert_eq!(
            *log.borrow(),
            vec![("done", StopReason::Completed), ("live", StopReason::Cancelled)]
        );
    }

    #[test]
    fn pausing_composite_pauses_active_child() {
        let mut arena = SpriteArena::new();
        let log = Log::default();
        let mut seq = Sequence::new(vec![delay(2, "a", &log), delay(2, "b", &log)]);
        seq.start().unwrap();
        seq.pause().unwrap();
        assert_eq!(seq.children()[0].state(), ActionState::Paused);

        seq.update(&mut arena, 1.0).unwrap();
        assert_eq!(seq.elapsed(), 0.0);

        seq.resume().unwrap();
        assert_eq!(seq.children()[0].state(), ActionState::Running);
    }

    #[test]
    fn dropping_a_running_composite_cancels_children() {
        let log = Log::default();
        {
            let mut seq = Sequence::new(vec![delay(3, "a", &log), delay(3, "b", &log)]);
            seq.start().unwrap();
        }
        assert_eq!(
            *log.borrow(),
            vec![("a", StopReason::Cancelled), ("b", StopReason::Cancelled)]
        );
    }
}
