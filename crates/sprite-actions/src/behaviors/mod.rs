//! Atomic behaviors.
//!
//! Every atomic action is an [`Until<E>`]: a per-frame [`Effect`] applied to
//! one target until a [`Condition`] holds. The effect decides *what* changes;
//! `Until` owns the lifecycle, the target lookup and the condition.
//!
//! - [`MoveUntil`]: position integration with optional bounds
//! - [`RotateUntil`], [`ScaleUntil`], [`FadeUntil`]: angle, scale, alpha
//! - [`BlinkUntil`]: periodic visibility toggling
//! - [`CallbackUntil`]: periodic host callback
//! - [`DelayUntil`]: waits without mutating anything

mod blink;
mod callback;
mod movement;
mod transform;

pub use blink::{Blink, BlinkUntil};
pub use callback::{CallbackUntil, DelayUntil, Idle, Periodic};
pub use movement::{
    Axis, AxisMask, BoundaryBehavior, BoundaryCallback, Bounds, MoveUntil, Movement, Side,
    VelocityHandle,
};
pub use transform::{Fade, FadeUntil, Rotation, RotateUntil, ScaleUntil, Scaling};

use crate::action::{Action, Lifecycle};
use crate::condition::Condition;
use crate::error::ActionError;
use crate::state::{ActionState, StopReason};
use crate::target::{Sprite, TargetId, TargetStore};

/// The per-frame mutation of an atomic behavior.
pub trait Effect {
    /// Name reported by the owning action.
    const NAME: &'static str;

    /// Applies one frame of `dt` reference frames.
    ///
    /// `sprite` is `None` only for targetless behaviors.
    fn apply(&mut self, sprite: Option<&mut Sprite>, dt: f32);

    /// Called once when the condition is satisfied, after the final `apply`.
    fn complete(&mut self, _sprite: Option<&mut Sprite>) {}
}

/// Runs an [`Effect`] every frame until its condition holds.
pub struct Until<E> {
    effect: E,
    target: Option<TargetId>,
    condition: Box<dyn Condition>,
    lifecycle: Lifecycle,
}

impl<E: Effect> Until<E> {
    pub(crate) fn from_parts(
        target: Option<TargetId>,
        effect: E,
        condition: impl Condition + 'static,
    ) -> Self {
        Self {
            effect,
            target,
            condition: Box::new(condition),
            lifecycle: Lifecycle::new(E::NAME),
        }
    }

    /// Registers a callback fired once when the action stops for any reason.
    #[must_use]
    pub fn on_stop(mut self, on_stop: impl FnOnce(StopReason) + 'static) -> Self {
        self.lifecycle.set_on_stop(Box::new(on_stop));
        self
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }

    /// Boxes the action for use in composites or the scheduler.
    pub fn boxed(self) -> Box<dyn Action>
    where
        E: 'static,
    {
        Box::new(self)
    }
}

impl<E: Effect> Action for Until<E> {
    fn name(&self) -> &'static str {
        E::NAME
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

    fn target(&self) -> Option<TargetId> {
        self.target
    }

    fn start(&mut self) -> Result<(), ActionError> {
        self.lifecycle.start()
    }

    fn update(&mut self, targets: &mut dyn TargetStore, dt: f32) -> Result<(), ActionError> {
        if !self.lifecycle.begin_update()? {
            return Ok(());
        }

        let mut sprite = match self.target {
            Some(id) => match targets.get_mut(id) {
                Some(sprite) => Some(sprite),
                None => {
                    self.lifecycle.finish(StopReason::TargetGone);
                    return Ok(());
                }
            },
            None => None,
        };

        self.effect.apply(sprite.as_deref_mut(), dt);
        let progress = self.lifecycle.advance(dt);

        if self.condition.done(&progress, sprite.as_deref()) {
            self.effect.complete(sprite.as_deref_mut());
            self.lifecycle.finish(StopReason::Completed);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), ActionError> {
        self.lifecycle.pause()
    }

    fn resume(&mut self) -> Result<(), ActionError> {
        self.lifecycle.resume()
    }

    fn stop_with(&mut self, reason: StopReason) {
        self.lifecycle.finish(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{after_frames, infinite, until};
    use crate::target::{SpriteArena, Vec2};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn move_until_threshold_completes_on_fifth_frame() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let mut action = MoveUntil::new(
            ship,
            Vec2::new(2.0, 0.0),
            until(|s: &Sprite| s.position.x >= 10.0),
        );
        action.start().unwrap();

        for _ in 0..4 {
            action.update(&mut arena, 1.0).unwrap();
            assert_eq!(action.state(), ActionState::Running);
        }
        action.update(&mut arena, 1.0).unwrap();

        assert_eq!(action.state(), ActionState::Done);
        assert_eq!(arena[ship].position, Vec2::new(10.0, 0.0));
        assert_eq!(arena[ship].velocity, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn missing_target_cancels_without_error() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let reasons = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&reasons);
        let mut action = MoveUntil::new(ship, Vec2::X, infinite())
            .on_stop(move |reason| log.borrow_mut().push(reason));
        action.start().unwrap();
        arena.remove(ship);

        action.update(&mut arena, 1.0).unwrap();

        assert_eq!(action.state(), ActionState::Cancelled);
        assert_eq!(action.stop_reason(), Some(StopReason::TargetGone));
        assert_eq!(*reasons.borrow(), vec![StopReason::TargetGone]);
        assert_eq!(action.elapsed(), 0.0);
    }

    #[test]
    fn updating_a_finished_action_is_an_error() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let mut action = MoveUntil::new(ship, Vec2::X, after_frames(1));
        action.start().unwrap();
        action.update(&mut arena, 1.0).unwrap();
        assert!(action.is_done());

        let err = action.update(&mut arena, 1.0).unwrap_err();
        assert_eq!(err.state(), ActionState::Done);
        assert_eq!(arena[ship].position.x, 1.0);
    }

    #[test]
    fn pause_discards_frame_time() {
        let mut arena = SpriteArena::new();
        let a = arena.insert(Sprite::default());
        let b = arena.insert(Sprite::default());

        let mut paused = MoveUntil::new(a, Vec2::X, infinite());
        paused.start().unwrap();
        paused.update(&mut arena, 1.5).unwrap();
        paused.pause().unwrap();
        paused.update(&mut arena, 7.0).unwrap();
        paused.resume().unwrap();
        paused.update(&mut arena, 2.0).unwrap();

        let mut straight = MoveUntil::new(b, Vec2::X, infinite());
        straight.start().unwrap();
        straight.update(&mut arena, 1.5).unwrap();
        straight.update(&mut arena, 2.0).unwrap();

        assert_eq!(paused.elapsed(), straight.elapsed());
        assert_eq!(arena[a].position, arena[b].position);
    }

    #[test]
    fn half_frames_match_whole_frames() {
        let mut arena = SpriteArena::new();
        let fine = arena.insert(Sprite::default());
        let coarse = arena.insert(Sprite::default());

        let mut fine_move = MoveUntil::new(fine, Vec2::new(3.0, -1.0), infinite());
        let mut coarse_move = MoveUntil::new(coarse, Vec2::new(3.0, -1.0), infinite());
        fine_move.start().unwrap();
        coarse_move.start().unwrap();

        fine_move.update(&mut arena, 0.5).unwrap();
        fine_move.update(&mut arena, 0.5).unwrap();
        coarse_move.update(&mut arena, 1.0).unwrap();

        assert_eq!(arena[fine].position, arena[coarse].position);
    }
}
