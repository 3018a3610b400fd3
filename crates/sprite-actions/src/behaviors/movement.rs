//! Movement with optional bounds.

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

use super::{Effect, Until};
use crate::condition::Condition;
use crate::target::{Sprite, TargetId, Vec2};

/// Moves a target by its velocity every frame until the condition holds.
pub type MoveUntil = Until<Movement>;

bitflags! {
    /// Axes a movement is allowed to write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AxisMask: u8 {
        const X = 0b01;
        const Y = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn of(self, v: Vec2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    fn set(self, v: &mut Vec2, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
        }
    }

    fn mask(self) -> AxisMask {
        match self {
            Axis::X => AxisMask::X,
            Axis::Y => AxisMask::Y,
        }
    }

    /// (low side, high side)
    fn sides(self) -> (Side, Side) {
        match self {
            Axis::X => (Side::Left, Side::Right),
            Axis::Y => (Side::Bottom, Side::Top),
        }
    }

    fn slot(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Bottom,
    Top,
}

/// Axis-aligned rectangle the target's position is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Bounds {
    pub const fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    fn span(&self, axis: Axis) -> (f32, f32) {
        match axis {
            Axis::X => (self.left, self.right),
            Axis::Y => (self.bottom, self.top),
        }
    }
}

/// What happens when the target reaches the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BoundaryBehavior {
    /// Clamp to the edge and zero the velocity component.
    Limit,
    /// Reflect back inside and reverse the velocity component.
    Bounce,
    /// Reappear at the opposite edge.
    Wrap,
}

/// Invoked with the target, the axis and the side involved.
pub type BoundaryCallback = Box<dyn FnMut(&mut Sprite, Axis, Side)>;

/// Shared velocity of a running [`MoveUntil`].
///
/// The scheduler owns the action, so the host changes its velocity through a
/// handle obtained before scheduling.
#[derive(Debug, Clone, Default)]
pub struct VelocityHandle(Rc<Cell<Vec2>>);

impl VelocityHandle {
    pub fn get(&self) -> Vec2 {
        self.0.get()
    }

    pub fn set(&self, velocity: Vec2) {
        self.0.set(velocity);
    }
}

pub struct Movement {
    velocity: VelocityHandle,
    provider: Option<Box<dyn FnMut() -> Vec2>>,
    axes: AxisMask,
    bounds: Option<(Bounds, BoundaryBehavior)>,
    on_enter: Option<BoundaryCallback>,
    on_exit: Option<BoundaryCallback>,
    // Limit contact per axis, for enter/exit edge detection.
    contact: [Option<Side>; 2],
}

impl Movement {
    pub fn velocity(&self) -> Vec2 {
        self.velocity.get()
    }

    fn resolve(&mut self, sprite: &mut Sprite, axis: Axis, bounds: Bounds, behavior: BoundaryBehavior) {
        let (min, max) = bounds.span(axis);
        let (low, high) = axis.sides();
        let pos = axis.of(sprite.position);

        match behavior {
            BoundaryBehavior::Limit => {
                let side = if pos <= min {
                    Some(low)
                } else if pos >= max {
                    Some(high)
                } else {
                    None
                };

                match side {
                    Some(side) => {
                        axis.set(&mut sprite.position, if side == low { min } else { max });
                        axis.set(&mut sprite.velocity, 0.0);
                        if self.contact[axis.slot()] != Some(side) {
                            self.contact[axis.slot()] = Some(side);
                            fire(&mut self.on_enter, sprite, axis, side);
                        }
                    }
                    None => {
                        if let Some(previous) = self.contact[axis.slot()].take() {
                            fire(&mut self.on_exit, sprite, axis, previous);
                        }
                    }
                }
            }
            BoundaryBehavior::Bounce => {
                let side = if pos < min {
                    axis.set(&mut sprite.position, min + (min - pos));
                    low
                } else if pos > max {
                    axis.set(&mut sprite.position, max - (pos - max));
                    high
                } else {
                    return;
                };

                let mut velocity = self.velocity.get();
                let reflected = -axis.of(velocity);
                axis.set(&mut velocity, reflected);
                self.velocity.set(velocity);
                axis.set(&mut sprite.velocity, axis.of(velocity));
                fire(&mut self.on_enter, sprite, axis, side);
            }
            BoundaryBehavior::Wrap => {
                let span = max - min;
                let side = if pos < min {
                    axis.set(&mut sprite.position, pos + span);
                    low
                } else if pos > max {
                    axis.set(&mut sprite.position, pos - span);
                    high
                } else {
                    return;
                };
                fire(&mut self.on_enter, sprite, axis, side);
            }
        }
    }
}

fn fire(callback: &mut Option<BoundaryCallback>, sprite: &mut Sprite, axis: Axis, side: Side) {
    if let Some(callback) = callback.as_mut() {
        callback(sprite, axis, side);
    }
}

impl Effect for Movement {
    const NAME: &'static str = "move_until";

    fn apply(&mut self, sprite: Option<&mut Sprite>, dt: f32) {
        let Some(sprite) = sprite else {
            return;
        };

        if let Some(provider) = self.provider.as_mut() {
            self.velocity.set(provider());
        }
        let velocity = self.velocity.get();

        for axis in [Axis::X, Axis::Y] {
            if self.axes.contains(axis.mask()) {
                axis.set(&mut sprite.velocity, axis.of(velocity));
                let moved = axis.of(sprite.position) + axis.of(velocity) * dt;
                axis.set(&mut sprite.position, moved);
            }
        }

        if let Some((bounds, behavior)) = self.bounds {
            for axis in [Axis::X, Axis::Y] {
                if self.axes.contains(axis.mask()) {
                    self.resolve(sprite, axis, bounds, behavior);
                }
            }
        }
    }
}

impl Until<Movement> {
    pub fn new(target: TargetId, velocity: Vec2, condition: impl Condition + 'static) -> Self {
        let movement = Movement {
            velocity: VelocityHandle(Rc::new(Cell::new(velocity))),
            provider: None,
            axes: AxisMask::all(),
            bounds: None,
            on_enter: None,
            on_exit: None,
            contact: [None; 2],
        };
        Self::from_parts(Some(target), movement, condition)
    }

    /// Only writes the x components of position and velocity.
    #[must_use]
    pub fn x_only(mut self) -> Self {
        self.effect.axes = AxisMask::X;
        self
    }

    /// Only writes the y components of position and velocity.
    #[must_use]
    pub fn y_only(mut self) -> Self {
        self.effect.axes = AxisMask::Y;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds, behavior: BoundaryBehavior) -> Self {
        self.effect.bounds = Some((bounds, behavior));
        self
    }

    #[must_use]
    pub fn on_boundary_enter(mut self, callback: impl FnMut(&mut Sprite, Axis, Side) + 'static) -> Self {
        self.effect.on_enter = Some(Box::new(callback));
        self
    }

    /// Only fired by [`BoundaryBehavior::Limit`], when the target leaves an edge.
    #[must_use]
    pub fn on_boundary_exit(mut self, callback: impl FnMut(&mut Sprite, Axis, Side) + 'static) -> Self {
        self.effect.on_exit = Some(Box::new(callback));
        self
    }

    /// Recomputes the velocity from `provider` at the start of every frame.
    #[must_use]
    pub fn with_velocity_provider(mut self, provider: impl FnMut() -> Vec2 + 'static) -> Self {
        self.effect.provider = Some(Box::new(provider));
        self
    }

    pub fn velocity_handle(&self) -> VelocityHandle {
        self.effect.velocity.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::condition::infinite;
    use crate::target::SpriteArena;
    use std::cell::RefCell;

    type Hits = Rc<RefCell<Vec<(Axis, Side)>>>;

    fn recorder(hits: &Hits) -> impl FnMut(&mut Sprite, Axis, Side) + 'static {
        let hits = Rc::clone(hits);
        move |_, axis, side| hits.borrow_mut().push((axis, side))
    }

    #[test]
    fn limit_clamps_and_reports_enter_then_exit() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::at(8.0, 0.0));
        let enters: Hits = Rc::default();
        let exits: Hits = Rc::default();

        let mut action = MoveUntil::new(ship, Vec2::new(-3.0, 0.0), infinite())
            .x_only()
            .with_bounds(Bounds::new(5.0, 0.0, 20.0, 10.0), BoundaryBehavior::Limit)
            .on_boundary_enter(recorder(&enters))
            .on_boundary_exit(recorder(&exits));
        let handle = action.velocity_handle();
        action.start().unwrap();

        action.update(&mut arena, 1.0).unwrap();
        assert_eq!(arena[ship].position.x, 5.0);
        assert_eq!(arena[ship].velocity.x, 0.0);
        action.update(&mut arena, 1.0).unwrap();
        assert_eq!(enters.borrow().len(), 1);

        handle.set(Vec2::new(2.0, 0.0));
        action.update(&mut arena, 1.0).unwrap();
        assert_eq!(arena[ship].position.x, 7.0);
        assert_eq!(*exits.borrow(), vec![(Axis::X, Side::Left)]);
    }

    #[test]
    fn bounce_reverses_velocity() {
        let mut arena = SpriteArena::new();
        let bar = arena.insert(Sprite::at(0.0, 9.0));
        let enters: Hits = Rc::default();

        let mut action = MoveUntil::new(bar, Vec2::new(0.0, 2.0), infinite())
            .y_only()
            .with_bounds(Bounds::new(0.0, 0.0, 10.0, 10.0), BoundaryBehavior::Bounce)
            .on_boundary_enter(recorder(&enters));
        let handle = action.velocity_handle();
        action.start().unwrap();

        action.update(&mut arena, 1.0).unwrap();
        assert_eq!(arena[bar].position.y, 9.0);
        assert_eq!(handle.get(), Vec2::new(0.0, -2.0));
        assert_eq!(*enters.borrow(), vec![(Axis::Y, Side::Top)]);

        action.update(&mut arena, 1.0).unwrap();
        assert_eq!(arena[bar].position.y, 7.0);
    }

    #[test]
    fn wrap_moves_to_opposite_edge_and_lets_callback_adjust() {
        let mut arena = SpriteArena::new();
        let hill = arena.insert(Sprite::at(1.0, 4.0));

        let mut action = MoveUntil::new(hill, Vec2::new(-3.0, 0.0), infinite())
            .with_bounds(Bounds::new(0.0, 0.0, 100.0, 10.0), BoundaryBehavior::Wrap)
            .on_boundary_enter(|sprite, axis, side| {
                assert_eq!((axis, side), (Axis::X, Side::Left));
                sprite.position.x = 90.0;
            });
        action.start().unwrap();

        action.update(&mut arena, 1.0).unwrap();
        assert_eq!(arena[hill].position, Vec2::new(90.0, 4.0));
    }

    #[test]
    fn provider_overrides_handle_each_frame() {
        let mut arena = SpriteArena::new();
        let ship = arena.insert(Sprite::default());
        let input = Rc::new(Cell::new(Vec2::ZERO));
        let source = Rc::clone(&input);

        let mut action = MoveUntil::new(ship, Vec2::new(100.0, 100.0), infinite())
            .with_velocity_provider(move || source.get());
        action.start().unwrap();

        input.set(Vec2::new(0.0, 5.0));
        action.update(&mut arena, 1.0).unwrap();
        input.set(Vec2::new(-8.0, 0.0));
        action.update(&mut arena, 1.0).unwrap();

        assert_eq!(arena[ship].position, Vec2::new(-8.0, 5.0));
        assert_eq!(action.effect().velocity(), Vec2::new(-8.0, 0.0));
    }
}
