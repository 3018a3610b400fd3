//! Completion conditions.
//!
//! A [`Condition`] is evaluated once per frame, after the action has applied
//! its mutation, and decides whether the action is done. Conditions may keep
//! internal state (see [`after_frames`]); each instance belongs to exactly one
//! action and is never shared, which is why [`Repeat`](crate::Repeat) builds a
//! fresh child (and with it a fresh condition) for every iteration.

use crate::Sprite;

/// Simulated frames per second that `dt == 1.0` corresponds to.
pub const REFERENCE_FPS: f32 = 60.0;

/// Converts seconds into reference frames.
#[inline]
pub fn frames_from_seconds(seconds: f32) -> f32 {
    seconds * REFERENCE_FPS
}

/// Time bookkeeping passed to a condition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    /// Accumulated `dt` since start, in reference frames.
    pub elapsed: f32,
    /// Number of non-paused updates since start.
    pub frames: u32,
    /// The `dt` of the current update.
    pub dt: f32,
}

impl Progress {
    /// Elapsed time in seconds at the reference frame rate.
    #[inline]
    pub fn seconds(&self) -> f32 {
        self.elapsed / REFERENCE_FPS
    }
}

/// Decides when a running action should stop.
pub trait Condition {
    /// Returns `true` once the action is done.
    ///
    /// `target` is `None` for actions without a target.
    fn done(&mut self, progress: &Progress, target: Option<&Sprite>) -> bool;
}

impl<F> Condition for F
where
    F: FnMut(&Progress, Option<&Sprite>) -> bool,
{
    #[inline]
    fn done(&mut self, progress: &Progress, target: Option<&Sprite>) -> bool {
        self(progress, target)
    }
}

/// Never satisfied; the action runs until it is stopped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Infinite;

impl Condition for Infinite {
    fn done(&mut self, _progress: &Progress, _target: Option<&Sprite>) -> bool {
        false
    }
}

/// Satisfied on its `n`-th evaluation. Counts evaluations itself.
#[derive(Debug, Clone, Copy)]
pub struct AfterFrames {
    remaining: u32,
}

impl Condition for AfterFrames {
    fn done(&mut self, _progress: &Progress, _target: Option<&Sprite>) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Satisfied once accumulated `elapsed` reaches a threshold (in frames).
#[derive(Debug, Clone, Copy)]
pub struct AfterElapsed {
    frames: f32,
}

impl Condition for AfterElapsed {
    fn done(&mut self, progress: &Progress, _target: Option<&Sprite>) -> bool {
        progress.elapsed >= self.frames
    }
}

/// Predicate over the target's state.
pub struct TargetPredicate<P> {
    predicate: P,
}

impl<P> Condition for TargetPredicate<P>
where
    P: FnMut(&Sprite) -> bool,
{
    fn done(&mut self, _progress: &Progress, target: Option<&Sprite>) -> bool {
        target.is_some_and(|sprite| (self.predicate)(sprite))
    }
}

pub fn infinite() -> Infinite {
    Infinite
}

/// Done after `n` updates (at least one).
pub fn after_frames(n: u32) -> AfterFrames {
    AfterFrames {
        remaining: n.max(1),
    }
}

/// Done once `elapsed >= frames`.
pub fn after_elapsed(frames: f32) -> AfterElapsed {
    AfterElapsed { frames }
}

/// Done once `seconds` of reference time have elapsed.
pub fn after_seconds(seconds: f32) -> AfterElapsed {
    AfterElapsed {
        frames: frames_from_seconds(seconds),
    }
}

/// Done once `predicate(target)` holds. Never done without a target.
pub fn until<P>(predicate: P) -> TargetPredicate<P>
where
    P: FnMut(&Sprite) -> bool,
{
    TargetPredicate { predicate }
}
