use super::{Effect, Until};
use crate::condition::{Condition, frames_from_seconds};
use crate::target::{Sprite, TargetId};

/// Toggles a target between visible and hidden until the condition holds.
pub type BlinkUntil = Until<Blink>;

type BlinkCallback = Box<dyn FnMut(&mut Sprite)>;

/// Visibility toggling with a fixed period.
///
/// The alpha observed on the first frame is the visible alpha; completion
/// restores it so a blink never leaves its target invisible.
pub struct Blink {
    period: f32,
    accumulated: f32,
    visible_alpha: Option<f32>,
    hidden: bool,
    on_enter: Option<BlinkCallback>,
    on_exit: Option<BlinkCallback>,
}

impl Blink {
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn toggle(&mut self, sprite: &mut Sprite, visible_alpha: f32) {
        self.hidden = !self.hidden;
        if self.hidden {
            sprite.alpha = 0.0;
            if let Some(on_exit) = self.on_exit.as_mut() {
                on_exit(sprite);
            }
        } else {
            sprite.alpha = visible_alpha;
            if let Some(on_enter) = self.on_enter.as_mut() {
                on_enter(sprite);
            }
        }
    }
}

impl Effect for Blink {
    const NAME: &'static str = "blink_until";

    fn apply(&mut self, sprite: Option<&mut Sprite>, dt: f32) {
        let Some(sprite) = sprite else {
            return;
        };
        let visible_alpha = *self.visible_alpha.get_or_insert(sprite.alpha);
        if !dt.is_finite() {
            return;
        }
        self.accumulated += dt;
        if self.accumulated < self.period {
            return;
        }

        // An even number of elapsed periods leaves the visibility unchanged.
        let periods = (self.accumulated / self.period).floor();
        self.accumulated = self.accumulated.rem_euclid(self.period);
        if periods % 2.0 == 1.0 {
            self.toggle(sprite, visible_alpha);
        }
    }

    fn complete(&mut self, sprite: Option<&mut Sprite>) {
        if !self.hidden {
            return;
        }
        if let (Some(sprite), Some(alpha)) = (sprite, self.visible_alpha) {
            self.hidden = false;
            sprite.alpha = alpha;
        }
    }
}

impl Until<Blink> {
    /// Toggles every `period_seconds`; periods shorter than one reference
    /// frame are raised to one frame.
    pub fn new(target: TargetId, period_seconds: f32, condition: impl Condition + 'static) -> Self {
        let blink = Blink {
            period: frames_from_seconds(period_seconds).max(1.0),
            accumulated: 0.0,
            visible_alpha: None,
            hidden: false,
            on_enter: None,
            on_exit: None,
        };
        Self::from_parts(Some(target), blink, condition)
    }

    /// Fired every time the target becomes visible again.
    #[must_use]
    pub fn on_blink_enter(mut self, callback: impl FnMut(&mut Sprite) + 'static) -> Self {
        self.effect.on_enter = Some(Box::new(callback));
        self
    }

    /// Fired every time the target is hidden.
    #[must_use]
    pub fn on_blink_exit(mut self, callback: impl FnMut(&mut Sprite) + 'static) -> Self {
        self.effect.on_exit = Some(Box::new(callback));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::condition::{after_frames, infinite};
    use crate::target::SpriteArena;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn toggles_every_period() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default().with_alpha(200.0));
        let hides = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hides);
        let mut blink = BlinkUntil::new(ship, 0.5, infinite())
            .on_blink_exit(move |_| counter.set(counter.get() + 1));
        blink.start().unwrap();

        blink.update(&mut arena, 15.0).unwrap();
        assert_eq!(arena[ship].alpha, 200.0);
        blink.update(&mut arena, 15.0).unwrap();
        assert_eq!(arena[ship].alpha, 0.0);
        blink.update(&mut arena, 30.0).unwrap();
        assert_eq!(arena[ship].alpha, 200.0);
        assert_eq!(hides.get(), 1);
    }

    #[test]
    fn completion_restores_alpha() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let mut blink = BlinkUntil::new(ship, 0.25, after_frames(3));
        blink.start().unwrap();
        for _ in 0..3 {
            blink.update(&mut arena, 15.0).unwrap();
        }

        assert!(blink.is_done());
        assert!(!blink.effect().is_hidden());
        assert!(arena[ship].is_visible());
    }

    #[test]
    fn huge_or_non_finite_dt_returns_promptly() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default().with_alpha(120.0));
        let mut blink = BlinkUntil::new(ship, 0.5, infinite());
        blink.start().unwrap();

        blink.update(&mut arena, f32::INFINITY).unwrap();
        assert_eq!(arena[ship].alpha, 120.0);

        blink.update(&mut arena, 1.0e9).unwrap();
        let alpha = arena[ship].alpha;
        assert!(alpha == 0.0 || alpha == 120.0);

        assert_eq!(blink.effect().is_hidden(), alpha == 0.0);
    }

    #[test]
    fn whole_periods_in_one_update_toggle_by_parity() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let mut blink = BlinkUntil::new(ship, 0.5, infinite());
        blink.start().unwrap();

        blink.update(&mut arena, 60.0).unwrap();
        assert!(!blink.effect().is_hidden());
        blink.update(&mut arena, 90.0).unwrap();
        assert!(blink.effect().is_hidden());
    }

    #[test]
    fn period_below_one_frame_is_raised() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let mut blink = BlinkUntil::new(ship, 0.0, infinite());
        blink.start().unwrap();
        blink.update(&mut arena, 1.0).unwrap();

        assert!(!arena[ship].is_visible());
    }
}
