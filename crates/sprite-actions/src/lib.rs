//! Frame-driven action scheduling for sprites.
//!
//! Behaviors (move, rotate, scale, fade, blink, callbacks) run against
//! host-owned sprites until a condition holds, and compose into sequences,
//! parallel groups and repeats. A [`Scheduler`] advances them once per frame.
//!
//! - **Host-owned targets**: actions hold a [`TargetId`] and reach sprites
//!   through the [`TargetStore`] passed to every tick
//! - **Reference frames**: `dt == 1.0` is one frame at [`REFERENCE_FPS`]
//! - **Single-threaded**: handles use `Rc`; nothing here is `Send`
//!
//! # Architecture
//!
//! - [`Action`]: core trait for atomic behaviors and composites
//! - [`Condition`]: decides when a running behavior is done
//! - Atomic behaviors: [`MoveUntil`], [`RotateUntil`], [`ScaleUntil`],
//!   [`FadeUntil`], [`BlinkUntil`], [`CallbackUntil`], [`DelayUntil`]
//! - Composites: [`Sequence`], [`Parallel`], [`Repeat`]
//! - [`Scheduler`]: registry, bindings (one action per target and tag),
//!   deferred [`Commands`] and the [`DebugSink`] hook
//!
//! # Example
//!
//! ```rust
//! use sprite_actions::{MoveUntil, Scheduler, Sprite, SpriteArena, Vec2, until};
//!
//! let mut sprites = SpriteArena::new();
//! let ship = sprites.insert(Sprite::default());
//!
//! let mut scheduler = Scheduler::new();
//! let reach = MoveUntil::new(ship, Vec2::new(2.0, 0.0), until(|s| s.position.x >= 10.0));
//! scheduler.bind(ship, "move", reach.boxed()).unwrap();
//!
//! while !scheduler.is_empty() {
//!     scheduler.tick(&mut sprites, 1.0);
//! }
//! assert_eq!(sprites[ship].position, Vec2::new(10.0, 0.0));
//! ```

pub mod action;
pub mod behaviors;
pub mod binding;
pub mod builder;
pub mod commands;
pub mod composite;
pub mod condition;
pub mod config;
pub mod debug;
pub mod decorator;
pub mod error;
pub mod scheduler;
pub mod state;
pub mod target;

// Re-export core types for ergonomic API
pub use action::{Action, Lifecycle, OnStop};
pub use behaviors::{
    Axis, BlinkUntil, BoundaryBehavior, Bounds, CallbackUntil, DelayUntil, FadeUntil, MoveUntil,
    RotateUntil, ScaleUntil, Side, VelocityHandle,
};
pub use binding::{BindingKey, Tag};
pub use commands::Commands;
pub use composite::{Parallel, Sequence};
pub use condition::{
    Condition, Progress, REFERENCE_FPS, after_elapsed, after_frames, after_seconds,
    frames_from_seconds, infinite, until,
};
pub use config::EngineConfig;
pub use debug::{ActionEvent, DebugSink, EventKind, RecordingSink, TracingSink};
pub use decorator::Repeat;
pub use error::{ActionError, SchedulerError};
pub use scheduler::{ActionId, Fault, Scheduler, TickReport};
pub use state::{ActionState, StopReason};
pub use target::{ALPHA_OPAQUE, Sprite, SpriteArena, TargetId, TargetStore, Vec2};
