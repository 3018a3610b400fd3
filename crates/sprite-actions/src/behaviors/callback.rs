use super::{Effect, Until};
use crate::condition::{Condition, frames_from_seconds};
use crate::target::{Sprite, TargetId};

/// Invokes a callback on a fixed interval until the condition holds.
pub type CallbackUntil = Until<Periodic>;

/// Waits without touching anything until the condition holds.
pub type DelayUntil = Until<Idle>;

/// Upper bound on catch-up calls when one update spans many intervals.
pub const MAX_CALLS_PER_UPDATE: u32 = 16;

enum Callback {
    Plain(Box<dyn FnMut()>),
    Sprite(Box<dyn FnMut(&mut Sprite)>),
}

pub struct Periodic {
    /// In reference frames; `None` fires once per update.
    interval: Option<f32>,
    accumulated: f32,
    calls: u32,
    callback: Callback,
}

impl Periodic {
    fn new(callback: Callback) -> Self {
        Self {
            interval: None,
            accumulated: 0.0,
            calls: 0,
            callback,
        }
    }

    fn invoke(&mut self, sprite: Option<&mut Sprite>) {
        self.calls += 1;
        match &mut self.callback {
            Callback::Plain(callback) => callback(),
            Callback::Sprite(callback) => {
                if let Some(sprite) = sprite {
                    callback(sprite);
                }
            }
        }
    }

    /// Number of times the callback has run.
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl Effect for Periodic {
    const NAME: &'static str = "callback_until";

    fn apply(&mut self, mut sprite: Option<&mut Sprite>, dt: f32) {
        let Some(interval) = self.interval else {
            self.invoke(sprite);
            return;
        };
        if !dt.is_finite() {
            return;
        }
        self.accumulated += dt;
        if self.accumulated < interval {
            return;
        }

        let due = (self.accumulated / interval).floor().min(MAX_CALLS_PER_UPDATE as f32) as u32;
        self.accumulated = self.accumulated.rem_euclid(interval);
        for _ in 0..due {
            self.invoke(sprite.as_deref_mut());
        }
    }
}

impl Until<Periodic> {
    /// Calls `callback` once per update until the condition holds.
    pub fn new(callback: impl FnMut() + 'static, condition: impl Condition + 'static) -> Self {
        let periodic = Periodic::new(Callback::Plain(Box::new(callback)));
        Self::from_parts(None, periodic, condition)
    }

    /// Like [`CallbackUntil::new`], but the callback receives the target.
    pub fn with_target(
        target: TargetId,
        callback: impl FnMut(&mut Sprite) + 'static,
        condition: impl Condition + 'static,
    ) -> Self {
        let periodic = Periodic::new(Callback::Sprite(Box::new(callback)));
        Self::from_parts(Some(target), periodic, condition)
    }

    /// Calls the callback every `seconds` instead of every update. Intervals
    /// shorter than one reference frame are raised to one frame.
    #[must_use]
    pub fn every(mut self, seconds: f32) -> Self {
        self.effect.interval = Some(frames_from_seconds(seconds).max(1.0));
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Effect for Idle {
    const NAME: &'static str = "delay_until";

    fn apply(&mut self, _sprite: Option<&mut Sprite>, _dt: f32) {}
}

impl Until<Idle> {
    pub fn new(condition: impl Condition + 'static) -> Self {
        Self::from_parts(None, Idle, condition)
    }
}
