//! Laser gates: a side-scrolling tunnel shooter played headlessly on top of
//! `sprite-actions`.
//!
//! A [`Session`] spawns a ship steered by a single bound move, two strips of
//! wrapping hills, shots that despawn when they stop, and forcefield waves
//! built from parallel, repeat and callback actions.

pub mod config;
pub mod session;

pub use config::SessionConfig;
pub use session::{
    Input, Role, Session, SessionStats, SessionSummary, SpriteSnapshot, TunnelControl,
    ship_velocity,
};
