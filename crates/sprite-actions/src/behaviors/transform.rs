use super::{Effect, Until};
use crate::condition::Condition;
use crate::target::{ALPHA_OPAQUE, Sprite, TargetId};

pub type RotateUntil = Until<Rotation>;
pub type ScaleUntil = Until<Scaling>;
pub type FadeUntil = Until<Fade>;

/// Adds `degrees_per_frame * dt` to the angle.
#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    degrees_per_frame: f32,
}

impl Effect for Rotation {
    const NAME: &'static str = "rotate_until";

    fn apply(&mut self, sprite: Option<&mut Sprite>, dt: f32) {
        if let Some(sprite) = sprite {
            sprite.angular_velocity = self.degrees_per_frame;
            sprite.angle += self.degrees_per_frame * dt;
        }
    }
}

impl Until<Rotation> {
    pub fn new(target: TargetId, degrees_per_frame: f32, condition: impl Condition + 'static) -> Self {
        Self::from_parts(Some(target), Rotation { degrees_per_frame }, condition)
    }
}

/// Adds `rate * dt` to the scale, never going below zero.
#[derive(Debug, Clone, Copy)]
pub struct Scaling {
    rate: f32,
}

impl Effect for Scaling {
    const NAME: &'static str = "scale_until";

    fn apply(&mut self, sprite: Option<&mut Sprite>, dt: f32) {
        if let Some(sprite) = sprite {
            sprite.scale = (sprite.scale + self.rate * dt).max(0.0);
        }
    }
}

impl Until<Scaling> {
    pub fn new(target: TargetId, rate: f32, condition: impl Condition + 'static) -> Self {
        Self::from_parts(Some(target), Scaling { rate }, condition)
    }
}

/// Adds `rate * dt` to alpha, clamped to `0.0..=255.0`.
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    rate: f32,
}

impl Effect for Fade {
    const NAME: &'static str = "fade_until";

    fn apply(&mut self, sprite: Option<&mut Sprite>, dt: f32) {
        if let Some(sprite) = sprite {
            sprite.alpha = (sprite.alpha + self.rate * dt).clamp(0.0, ALPHA_OPAQUE);
        }
    }
}

impl Until<Fade> {
    pub fn new(target: TargetId, rate: f32, condition: impl Condition + 'static) -> Self {
        Self::from_parts(Some(target), Fade { rate }, condition)
    }
}
