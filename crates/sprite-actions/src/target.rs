//! Targets: the sprites actions are allowed to mutate.
//!
//! The engine never owns a target. Actions hold a [`TargetId`] and resolve it
//! through the [`TargetStore`] handed to every update, so a target removed by
//! the host is detected as missing instead of being dereferenced.

use std::fmt;

pub use glam::Vec2;

/// Fully opaque alpha value.
pub const ALPHA_OPAQUE: f32 = 255.0;

/// The attribute set an action may read and write.
///
/// Everything else about a game object (texture, hit box, game rules) lives
/// with the host and is invisible to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sprite {
    pub position: Vec2,
    /// Displacement per reference frame.
    pub velocity: Vec2,
    /// Rotation in degrees.
    pub angle: f32,
    /// Degrees per reference frame.
    pub angular_velocity: f32,
    pub scale: f32,
    /// Opacity in `0.0..=255.0`.
    pub alpha: f32,
}

impl Sprite {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn at(x: f32, y: f32) -> Self {
        Self::new(Vec2::new(x, y))
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, ALPHA_OPAQUE);
        self
    }

    /// Returns true if the sprite is not fully transparent.
    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            scale: 1.0,
            alpha: ALPHA_OPAQUE,
        }
    }
}

/// Generational handle identifying a target inside a [`TargetStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetId {
    index: u32,
    generation: u32,
}

impl TargetId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Lookup surface through which actions reach their targets.
///
/// Returning `None` for an id means the target is gone; the action owning
/// that id cancels itself with [`StopReason::TargetGone`](crate::StopReason::TargetGone).
pub trait TargetStore {
    fn get(&self, id: TargetId) -> Option<&Sprite>;

    fn get_mut(&mut self, id: TargetId) -> Option<&mut Sprite>;

    fn contains(&self, id: TargetId) -> bool {
        self.get(id).is_some()
    }
}

struct Slot {
    generation: u32,
    sprite: Option<Sprite>,
}

/// Generational arena of sprites.
///
/// Removing a sprite bumps its slot generation, so ids handed out before the
/// removal never resolve to whatever is inserted into the slot later.
#[derive(Default)]
pub struct SpriteArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl SpriteArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sprite: Sprite) -> TargetId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.sprite = Some(sprite);
            return TargetId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            sprite: Some(sprite),
        });
        TargetId::new(index, 0)
    }

    pub fn remove(&mut self, id: TargetId) -> Option<Sprite> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let sprite = slot.sprite.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(sprite)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates live sprites in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &Sprite)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.sprite
                .as_ref()
                .map(|sprite| (TargetId::new(index as u32, slot.generation), sprite))
        })
    }
}

impl TargetStore for SpriteArena {
    fn get(&self, id: TargetId) -> Option<&Sprite> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.sprite.as_ref())
    }

    fn get_mut(&mut self, id: TargetId) -> Option<&mut Sprite> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.sprite.as_mut())
    }
}

impl std::ops::Index<TargetId> for SpriteArena {
    type Output = Sprite;

    /// # Panics
    ///
    /// Panics if the target has been removed.
    fn index(&self, id: TargetId) -> &Sprite {
        match self.get(id) {
            Some(sprite) => sprite,
            None => panic!("sprite {id} is not in the arena"),
        }
    }
}
