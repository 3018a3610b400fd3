//! Builder utilities for ergonomic action construction.
//!
//! Instead of writing `Box::new(Sequence::new(vec![...]))` you can write
//! `sequence(vec![...])`. Atomic shorthands return boxed actions so they drop
//! straight into composite child lists.

use crate::behaviors::{DelayUntil, FadeUntil, MoveUntil, RotateUntil, ScaleUntil};
use crate::condition::Condition;
use crate::target::{TargetId, Vec2};
use crate::{Action, Parallel, Repeat, Sequence};

/// Shorthand for `Box::new(Sequence::new(children))`.
#[inline]
pub fn sequence(children: Vec<Box<dyn Action>>) -> Box<dyn Action> {
    Box::new(Sequence::new(children))
}

/// Shorthand for `Box::new(Parallel::new(children))`.
#[inline]
pub fn parallel(children: Vec<Box<dyn Action>>) -> Box<dyn Action> {
    Box::new(Parallel::new(children))
}

/// Shorthand for `Box::new(Repeat::new(factory, predicate))`.
#[inline]
pub fn repeat(
    factory: impl FnMut() -> Box<dyn Action> + 'static,
    predicate: impl FnMut(u32) -> bool + 'static,
) -> Box<dyn Action> {
    Box::new(Repeat::new(factory, predicate))
}

/// Shorthand for `Box::new(Repeat::forever(factory))`.
#[inline]
pub fn repeat_forever(factory: impl FnMut() -> Box<dyn Action> + 'static) -> Box<dyn Action> {
    Box::new(Repeat::forever(factory))
}

#[inline]
pub fn move_until(
    target: TargetId,
    velocity: Vec2,
    condition: impl Condition + 'static,
) -> Box<dyn Action> {
    MoveUntil::new(target, velocity, condition).boxed()
}

#[inline]
pub fn rotate_until(
    target: TargetId,
    degrees_per_frame: f32,
    condition: impl Condition + 'static,
) -> Box<dyn Action> {
    RotateUntil::new(target, degrees_per_frame, condition).boxed()
}

#[inline]
pub fn scale_until(target: TargetId, rate: f32, condition: impl Condition + 'static) -> Box<dyn Action> {
    ScaleUntil::new(target, rate, condition).boxed()
}

#[inline]
pub fn fade_until(target: TargetId, rate: f32, condition: impl Condition + 'static) -> Box<dyn Action> {
    FadeUntil::new(target, rate, condition).boxed()
}

#[inline]
pub fn delay_until(condition: impl Condition + 'static) -> Box<dyn Action> {
    DelayUntil::new(condition).boxed()
}
