//! World dimensions, speeds and session settings.

use sprite_actions::{Bounds, EngineConfig};

// Window and world dimensions
pub const HILL_WIDTH: f32 = 512.0;
pub const HILL_HEIGHT: f32 = 57.0;
pub const HILL_SLICES: usize = 4;
pub const WINDOW_WIDTH: f32 = HILL_WIDTH * 2.0;
pub const WINDOW_HEIGHT: f32 = 432.0;

// Player ship
pub const PLAYER_SHIP_VERT: f32 = 5.0;
pub const PLAYER_SHIP_HORIZ: f32 = 8.0;
pub const PLAYER_SHIP_FIRE_SPEED: f32 = 15.0;
pub const FIRE_INTERVAL_FRAMES: u64 = 45;

// Tunnel
pub const WALL_WIDTH: f32 = 200.0;
pub const TUNNEL_VELOCITY: f32 = -3.0;
pub const TUNNEL_WALL_HEIGHT: f32 = 50.0;

// Ship movement bounds
pub const SHIP_LEFT_BOUND: f32 = HILL_WIDTH / 4.0;
pub const SHIP_RIGHT_BOUND: f32 = WINDOW_WIDTH - HILL_WIDTH / 1.5;

// Forcefield waves
pub const FORCEFIELD_SPACING: f32 = 220.0;
pub const FORCEFIELD_BLINK_SECONDS: f32 = 0.5;
pub const FORCEFIELD_COLOR_SECONDS: f32 = 0.1;
pub const FORCEFIELD_HALF_WIDTH: f32 = 26.5;
pub const FORCEFIELD_COLORS: [(u8, u8, u8); 4] = [
    (255, 64, 64),
    (255, 160, 64),
    (255, 255, 96),
    (160, 255, 160),
];

pub const SHIP_BOUNDS: Bounds = Bounds::new(
    SHIP_LEFT_BOUND,
    TUNNEL_WALL_HEIGHT,
    SHIP_RIGHT_BOUND,
    WINDOW_HEIGHT - TUNNEL_WALL_HEIGHT,
);

pub const TOP_BOUNDS: Bounds = Bounds::new(
    -HILL_WIDTH,
    WINDOW_HEIGHT / 2.0,
    HILL_WIDTH * 5.0,
    WINDOW_HEIGHT,
);

pub const BOTTOM_BOUNDS: Bounds = Bounds::new(-HILL_WIDTH, 0.0, HILL_WIDTH * 5.0, WINDOW_HEIGHT / 2.0);

/// Settings for one headless session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Number of frames to simulate.
    pub frames: u64,
    /// Delta per frame, in reference frames.
    pub dt: f32,
    /// Forcefields per wave (at least one).
    pub forcefields: usize,
    pub engine: EngineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frames: 900,
            dt: 1.0,
            forcefields: 3,
            engine: EngineConfig::default(),
        }
    }
}
