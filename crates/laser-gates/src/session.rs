//! Headless laser gates session.
//!
//! The session owns the sprites and the scheduler and plays the host game
//! loop: it feeds input, ticks the scheduler once per frame, and reacts to
//! what callbacks report through shared cells (despawned shots, a finished
//! wave). Actions never see the session itself.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use sprite_actions::builder::{fade_until, parallel, repeat_forever, rotate_until, scale_until, sequence};
use sprite_actions::{
    ALPHA_OPAQUE, ActionId, Axis, BlinkUntil, BoundaryBehavior, Bounds, CallbackUntil, MoveUntil, Parallel,
    Scheduler, SchedulerError, Side, Sprite, SpriteArena, TargetId, TargetStore, TickReport, Vec2,
    VelocityHandle, after_frames, infinite, until,
};

use crate::config::{
    BOTTOM_BOUNDS, FIRE_INTERVAL_FRAMES, FORCEFIELD_BLINK_SECONDS, FORCEFIELD_COLOR_SECONDS,
    FORCEFIELD_COLORS, FORCEFIELD_HALF_WIDTH, FORCEFIELD_SPACING, HILL_HEIGHT, HILL_SLICES,
    HILL_WIDTH, PLAYER_SHIP_FIRE_SPEED, PLAYER_SHIP_HORIZ, PLAYER_SHIP_VERT, SHIP_BOUNDS,
    SHIP_LEFT_BOUND, SessionConfig, TOP_BOUNDS, TUNNEL_VELOCITY, TUNNEL_WALL_HEIGHT, WALL_WIDTH,
    WINDOW_HEIGHT, WINDOW_WIDTH,
};

/// What a sprite is in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Ship,
    Hill,
    Shot,
    Forcefield,
}

/// Directional keys held during a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Input {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Input {
    pub const NONE: Self = Self {
        left: false,
        right: false,
        up: false,
        down: false,
    };

    pub const RIGHT: Self = Self {
        right: true,
        ..Self::NONE
    };

    pub const LEFT: Self = Self {
        left: true,
        ..Self::NONE
    };

    /// Input played back by [`Session::step`]: a 240-frame loop that pushes
    /// the ship against the right bound, steers it vertically, lets it drift
    /// and pulls it back left.
    pub fn scripted(frame: u64) -> Self {
        match frame % 240 {
            0..90 => Self::RIGHT,
            90..120 => Self {
                up: true,
                ..Self::NONE
            },
            120..150 => Self::NONE,
            150..180 => Self {
                down: true,
                ..Self::NONE
            },
            _ => Self::LEFT,
        }
    }
}

/// Velocity of the ship for the held keys.
///
/// Idle ships drift with the tunnel unless they already sit on the left
/// bound; the left bound also blocks steering further left.
pub fn ship_velocity(input: Input, ship_x: f32) -> Vec2 {
    let at_left_bound = ship_x <= SHIP_LEFT_BOUND;

    let mut horizontal = match (input.left, input.right) {
        (false, true) => PLAYER_SHIP_HORIZ,
        (true, false) => -PLAYER_SHIP_HORIZ,
        _ => 0.0,
    };
    let vertical = match (input.down, input.up) {
        (false, true) => PLAYER_SHIP_VERT,
        (true, false) => -PLAYER_SHIP_VERT,
        _ => 0.0,
    };

    if horizontal != 0.0 || vertical != 0.0 {
        if horizontal < 0.0 && at_left_bound {
            horizontal = 0.0;
        }
        return Vec2::new(horizontal, vertical);
    }

    if at_left_bound {
        Vec2::ZERO
    } else {
        Vec2::new(TUNNEL_VELOCITY, 0.0)
    }
}

#[derive(Default)]
struct TunnelState {
    speed: f32,
    hills: Vec<VelocityHandle>,
    wave: Vec<VelocityHandle>,
}

/// Scroll speed shared by the hills and the current wave.
///
/// Holds the velocity handles of every scrolling move so a speed change
/// retargets the running actions instead of rescheduling them.
#[derive(Clone)]
pub struct TunnelControl {
    state: Rc<RefCell<TunnelState>>,
}

impl TunnelControl {
    fn new(speed: f32) -> Self {
        Self {
            state: Rc::new(RefCell::new(TunnelState {
                speed,
                ..TunnelState::default()
            })),
        }
    }

    pub fn speed(&self) -> f32 {
        self.state.borrow().speed
    }

    pub fn set_tunnel_velocity(&self, speed: f32) {
        let mut state = self.state.borrow_mut();
        if state.speed != speed {
            tracing::debug!("Tunnel velocity {} -> {}", state.speed, speed);
        }
        state.speed = speed;
        for handle in state.hills.iter().chain(state.wave.iter()) {
            handle.set(Vec2::new(speed, 0.0));
        }
    }

    fn track_hill(&self, handle: VelocityHandle) {
        self.state.borrow_mut().hills.push(handle);
    }

    fn track_wave(&self, handle: VelocityHandle) {
        self.state.borrow_mut().wave.push(handle);
    }

    fn clear_wave(&self) {
        self.state.borrow_mut().wave.clear();
    }
}

impl fmt::Debug for TunnelControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TunnelControl")
            .field("speed", &state.speed)
            .field("hills", &state.hills.len())
            .field("wave", &state.wave.len())
            .finish()
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub shots_fired: u32,
    pub shots_blocked: u32,
    pub waves_cleared: u32,
    pub hill_wraps: u32,
    pub speedups: u32,
    pub actions_finished: u32,
    pub faults: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpriteSnapshot {
    pub id: TargetId,
    pub role: Role,
    pub sprite: Sprite,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub tunnel_speed: f32,
    pub sprites: usize,
    pub active_actions: usize,
    pub stats: SessionStats,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} sprites, {} active actions, {} shots ({} blocked), {} waves cleared, {} hill wraps, {} speedups, {} faults",
            self.frames,
            self.sprites,
            self.active_actions,
            self.stats.shots_fired,
            self.stats.shots_blocked,
            self.stats.waves_cleared,
            self.stats.hill_wraps,
            self.stats.speedups,
            self.stats.faults,
        )
    }
}

/// Shared cells written by action callbacks and read back by the session.
#[derive(Default)]
struct Signals {
    despawn: Rc<RefCell<Vec<TargetId>>>,
    wave_done: Rc<Cell<bool>>,
    shields_active: Rc<Cell<bool>>,
    wave_color: Rc<Cell<usize>>,
    hill_wraps: Rc<Cell<u32>>,
    speedups: Rc<Cell<u32>>,
}

pub struct Session {
    config: SessionConfig,
    scheduler: Scheduler,
    sprites: SpriteArena,
    roles: BTreeMap<TargetId, Role>,
    tunnel: TunnelControl,
    input: Rc<Cell<Input>>,
    ship_x: Rc<Cell<f32>>,
    ship: TargetId,
    shot: Option<(TargetId, ActionId)>,
    wave: Vec<TargetId>,
    signals: Signals,
    stats: SessionStats,
}

impl Session {
    /// Spawns the ship, the hills and the first wave.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial actions cannot be scheduled.
    pub fn new(config: SessionConfig) -> Result<Self, SchedulerError> {
        let scheduler = Scheduler::with_config(config.engine.clone());
        let mut sprites = SpriteArena::new();
        let ship = sprites.insert(Sprite::at(SHIP_LEFT_BOUND, WINDOW_HEIGHT / 2.0));

        let mut session = Self {
            config,
            scheduler,
            sprites,
            roles: BTreeMap::from([(ship, Role::Ship)]),
            tunnel: TunnelControl::new(TUNNEL_VELOCITY),
            input: Rc::new(Cell::new(Input::NONE)),
            ship_x: Rc::new(Cell::new(SHIP_LEFT_BOUND)),
            ship,
            shot: None,
            wave: Vec::new(),
            signals: Signals::default(),
            stats: SessionStats::default(),
        };

        session.setup_ship()?;
        session.setup_hills()?;
        session.tunnel.set_tunnel_velocity(TUNNEL_VELOCITY);
        session.spawn_wave()?;

        tracing::info!(
            "Session ready: {} sprites, {} actions",
            session.sprites.len(),
            session.scheduler.len()
        );
        Ok(session)
    }

    /// Advances one frame with the scripted input.
    pub fn step(&mut self) -> Result<TickReport, SchedulerError> {
        let frame = self.scheduler.frame();
        let fire = frame % FIRE_INTERVAL_FRAMES == 0;
        self.step_with(Input::scripted(frame), fire)
    }

    /// Advances one frame with the given keys held; `fire` shoots if no shot
    /// is in flight.
    pub fn step_with(&mut self, input: Input, fire: bool) -> Result<TickReport, SchedulerError> {
        self.input.set(input);
        if fire && self.shot.is_none() {
            self.fire_shot()?;
        }

        let report = self.scheduler.tick(&mut self.sprites, self.config.dt);
        self.stats.actions_finished += report.finished.len() as u32;
        self.stats.faults += report.faults.len() as u32;

        self.check_shot_blocked();
        self.despawn();

        if self.signals.wave_done.get() {
            self.clear_wave();
            self.celebrate()?;
            self.spawn_wave()?;
        }

        if let Some(ship) = self.sprites.get(self.ship) {
            self.ship_x.set(ship.position.x);
        }
        Ok(report)
    }

    /// Runs the configured number of frames.
    pub fn run(&mut self) -> Result<SessionSummary, SchedulerError> {
        for _ in 0..self.config.frames {
            let report = self.step()?;
            if !report.is_clean() {
                tracing::warn!("Frame {}: {} faults", report.frame, report.faults.len());
            }
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            frames: self.scheduler.frame(),
            tunnel_speed: self.tunnel.speed(),
            sprites: self.sprites.len(),
            active_actions: self.scheduler.len(),
            stats: self.stats(),
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            hill_wraps: self.signals.hill_wraps.get(),
            speedups: self.signals.speedups.get(),
            ..self.stats
        }
    }

    /// Every live sprite with its role, in id order.
    pub fn snapshot(&self) -> Vec<SpriteSnapshot> {
        self.roles
            .iter()
            .filter_map(|(&id, &role)| {
                self.sprites.get(id).map(|sprite| SpriteSnapshot {
                    id,
                    role,
                    sprite: *sprite,
                })
            })
            .collect()
    }

    pub fn ship(&self) -> TargetId {
        self.ship
    }

    pub fn sprite(&self, id: TargetId) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    pub fn sprites_with_role(&self, role: Role) -> impl Iterator<Item = TargetId> + '_ {
        self.roles
            .iter()
            .filter(move |(_, r)| **r == role)
            .map(|(id, _)| *id)
    }

    pub fn shot(&self) -> Option<TargetId> {
        self.shot.map(|(shot, _)| shot)
    }

    /// Forcefields of the current wave.
    pub fn wave(&self) -> &[TargetId] {
        &self.wave
    }

    pub fn shields_active(&self) -> bool {
        self.signals.shields_active.get()
    }

    pub fn wave_color(&self) -> (u8, u8, u8) {
        FORCEFIELD_COLORS[self.signals.wave_color.get()]
    }

    pub fn tunnel(&self) -> &TunnelControl {
        &self.tunnel
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    fn spawn(&mut self, role: Role, sprite: Sprite) -> TargetId {
        let id = self.sprites.insert(sprite);
        self.roles.insert(id, role);
        id
    }

    fn remove(&mut self, id: TargetId) {
        self.sprites.remove(id);
        self.roles.remove(&id);
    }

    fn setup_ship(&mut self) -> Result<(), SchedulerError> {
        let provider = {
            let input = Rc::clone(&self.input);
            let ship_x = Rc::clone(&self.ship_x);
            move || ship_velocity(input.get(), ship_x.get())
        };
        let on_enter = {
            let tunnel = self.tunnel.clone();
            let speedups = Rc::clone(&self.signals.speedups);
            move |_: &mut Sprite, axis: Axis, side: Side| {
                if axis == Axis::X && side == Side::Right {
                    speedups.set(speedups.get() + 1);
                    tunnel.set_tunnel_velocity(TUNNEL_VELOCITY * 2.0);
                }
            }
        };
        let on_exit = {
            let tunnel = self.tunnel.clone();
            move |_: &mut Sprite, axis: Axis, side: Side| {
                if axis == Axis::X && side == Side::Right {
                    tunnel.set_tunnel_velocity(TUNNEL_VELOCITY);
                }
            }
        };

        let movement = MoveUntil::new(self.ship, Vec2::ZERO, infinite())
            .with_velocity_provider(provider)
            .with_bounds(SHIP_BOUNDS, BoundaryBehavior::Limit)
            .on_boundary_enter(on_enter)
            .on_boundary_exit(on_exit);
        self.scheduler.bind(self.ship, "player_move", movement.boxed())?;
        Ok(())
    }

    fn setup_hills(&mut self) -> Result<(), SchedulerError> {
        for strip in [0.0, HILL_WIDTH * 2.0] {
            for slice in 0..HILL_SLICES {
                let offset = HILL_HEIGHT * (slice as f32 + 0.5);
                let top = self.spawn(
                    Role::Hill,
                    Sprite::at(strip + HILL_WIDTH / 2.0, WINDOW_HEIGHT - TUNNEL_WALL_HEIGHT - offset),
                );
                self.scroll_hill(top, TOP_BOUNDS)?;

                let bottom = self.spawn(
                    Role::Hill,
                    Sprite::at(strip + HILL_WIDTH * 1.5, TUNNEL_WALL_HEIGHT + offset),
                );
                self.scroll_hill(bottom, BOTTOM_BOUNDS)?;
            }
        }
        Ok(())
    }

    fn scroll_hill(&mut self, hill: TargetId, bounds: Bounds) -> Result<(), SchedulerError> {
        let wraps = Rc::clone(&self.signals.hill_wraps);
        let movement = MoveUntil::new(hill, Vec2::new(self.tunnel.speed(), 0.0), infinite())
            .x_only()
            .with_bounds(bounds, BoundaryBehavior::Wrap)
            .on_boundary_enter(move |sprite, _, _| {
                wraps.set(wraps.get() + 1);
                sprite.position.x = HILL_WIDTH * 3.0;
            });
        self.tunnel.track_hill(movement.velocity_handle());
        self.scheduler.bind(hill, "tunnel_velocity", movement.boxed())?;
        Ok(())
    }

    fn fire_shot(&mut self) -> Result<(), SchedulerError> {
        let Some(origin) = self.sprites.get(self.ship).map(|ship| ship.position) else {
            return Ok(());
        };
        let shot = self.spawn(
            Role::Shot,
            Sprite::at(origin.x + PLAYER_SHIP_HORIZ * 2.0, origin.y).with_alpha(0.0),
        );

        let flight = MoveUntil::new(
            shot,
            Vec2::new(PLAYER_SHIP_FIRE_SPEED, 0.0),
            until(|s| s.position.x < 0.0 || s.position.x > WINDOW_WIDTH),
        );
        let despawn = Rc::clone(&self.signals.despawn);
        let action = Parallel::new(vec![
            flight.boxed(),
            fade_until(shot, 85.0, until(|s| s.alpha >= ALPHA_OPAQUE)),
        ])
        .on_stop(move |reason| {
            tracing::trace!("Shot {} stopped: {}", shot, reason);
            despawn.borrow_mut().push(shot);
        });

        let id = self.scheduler.schedule(Box::new(action))?;
        self.shot = Some((shot, id));
        self.stats.shots_fired += 1;
        Ok(())
    }

    fn check_shot_blocked(&mut self) {
        if !self.signals.shields_active.get() {
            return;
        }
        let Some((shot, action)) = self.shot else {
            return;
        };
        let Some(shot_x) = self.sprites.get(shot).map(|s| s.position.x) else {
            return;
        };

        let blocked = self.wave.iter().any(|&forcefield| {
            self.sprites
                .get(forcefield)
                .is_some_and(|f| (f.position.x - shot_x).abs() <= FORCEFIELD_HALF_WIDTH)
        });
        if blocked && self.scheduler.stop(action) {
            self.stats.shots_blocked += 1;
        }
    }

    fn despawn(&mut self) {
        let despawned: Vec<_> = self.signals.despawn.borrow_mut().drain(..).collect();
        for id in despawned {
            if self.shot.is_some_and(|(shot, _)| shot == id) {
                self.shot = None;
            }
            self.remove(id);
        }
    }

    fn spawn_wave(&mut self) -> Result<(), SchedulerError> {
        let count = self.config.forcefields.max(1);
        let last = count - 1;
        let speed = self.tunnel.speed();
        let bounds = Bounds::new(-WALL_WIDTH, 0.0, forcefield_x(last) + WALL_WIDTH, WINDOW_HEIGHT);

        self.signals.wave_done.set(false);
        self.signals.shields_active.set(true);

        for index in 0..count {
            let forcefield = self.spawn(
                Role::Forcefield,
                Sprite::at(forcefield_x(index), WINDOW_HEIGHT / 2.0),
            );

            let mut movement = MoveUntil::new(forcefield, Vec2::new(speed, 0.0), infinite()).x_only();
            if index == last {
                let wave_done = Rc::clone(&self.signals.wave_done);
                movement = movement
                    .with_bounds(bounds, BoundaryBehavior::Limit)
                    .on_boundary_enter(move |_, axis, side| {
                        if axis == Axis::X && side == Side::Left {
                            wave_done.set(true);
                        }
                    });
            }
            self.tunnel.track_wave(movement.velocity_handle());

            let shields_on = Rc::clone(&self.signals.shields_active);
            let shields_off = Rc::clone(&self.signals.shields_active);
            let blink = BlinkUntil::new(forcefield, FORCEFIELD_BLINK_SECONDS, infinite())
                .on_blink_enter(move |_| shields_on.set(true))
                .on_blink_exit(move |_| shields_off.set(false));

            self.scheduler.bind(
                forcefield,
                "shield_move",
                parallel(vec![movement.boxed(), blink.boxed()]),
            )?;
            self.scheduler.schedule(repeat_forever(move || {
                sequence(vec![
                    scale_until(forcefield, 0.02, after_frames(10)),
                    scale_until(forcefield, -0.02, after_frames(10)),
                ])
            }))?;
            self.wave.push(forcefield);
        }

        let color = Rc::clone(&self.signals.wave_color);
        let cycler = CallbackUntil::with_target(
            self.wave[last],
            move |_| color.set((color.get() + 1) % FORCEFIELD_COLORS.len()),
            infinite(),
        )
        .every(FORCEFIELD_COLOR_SECONDS);
        self.scheduler.schedule(cycler.boxed())?;

        tracing::info!("Wave spawned: {} forcefields at speed {}", count, speed);
        Ok(())
    }

    fn clear_wave(&mut self) {
        let wave = std::mem::take(&mut self.wave);
        for &forcefield in &wave {
            self.scheduler.stop_for_target(forcefield);
            self.remove(forcefield);
        }
        self.tunnel.clear_wave();
        self.signals.wave_done.set(false);
        self.signals.shields_active.set(false);
        self.signals.wave_color.set(0);
        self.stats.waves_cleared += 1;

        tracing::info!(
            "Wave cleared at frame {} ({} total)",
            self.scheduler.frame(),
            self.stats.waves_cleared
        );
    }

    /// Spins the ship once around.
    fn celebrate(&mut self) -> Result<(), SchedulerError> {
        let spin = rotate_until(self.ship, 12.0, after_frames(30));
        self.scheduler.bind(self.ship, "ship_spin", spin)?;
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("frame", &self.scheduler.frame())
            .field("sprites", &self.sprites.len())
            .field("actions", &self.scheduler.len())
            .field("tunnel", &self.tunnel)
            .finish()
    }
}

fn forcefield_x(index: usize) -> f32 {
    WINDOW_WIDTH + WALL_WIDTH + index as f32 * FORCEFIELD_SPACING
}
