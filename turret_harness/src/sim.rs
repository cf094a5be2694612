//! Simulated turret rig
//!
//! A fixed camera looks at a flat scene containing (optionally) one circular
//! target. The laser dot lands at a point that moves linearly with the servo
//! setpoints, so the closed loop can be exercised end to end without hardware:
//! commands sent over [`SimLink`] move the dot in the frames rendered by
//! [`SimFrames`].
//!
//! The shape detector reads the scene truth (with seeded dropout and jitter)
//! rather than finding rings in pixels. The laser dot is found in the rendered
//! frames by the real [`RedSpotDetector`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ndarray::Array3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use turret::clock::Clock;
use turret::config::{AxisLimits, LinkConfig};
use turret::detection::{Detection, Frame, FrameSource, Point, RedSpotDetector, ShapeDetector};
use turret::error::ChannelError;
use turret::link::CommandChannel;
use turret::mock::ManualClock;
use turret::protocol::ModeCommand;
use turret::{Rig, TurretCommand};

const TARGET_GRAY: u8 = 128;
const RING_THICKNESS: i32 = 3;
const LASER_RADIUS: i32 = 3;

/// Scene and sensor parameters for a simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub width: usize,
    pub height: usize,
    /// Where the laser lands with both servos at neutral
    pub laser_origin: Point,
    /// Laser displacement in pixels per microsecond of servo travel
    pub px_per_us: f64,
    /// Target in the scene, if any
    pub target: Option<Detection>,
    /// Frame number from which the target is in the scene
    pub target_appears_at: u64,
    /// Chance the shape detector misses a visible target
    pub dropout_probability: f64,
    /// Maximum detection position error in pixels
    pub jitter_px: i32,
    pub frame_interval: Duration,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            laser_origin: Point::new(160, 120),
            px_per_us: 0.5,
            target: Some(Detection::new(220, 140, 40)),
            target_appears_at: 0,
            dropout_probability: 0.0,
            jitter_px: 0,
            frame_interval: Duration::from_millis(33),
            seed: 42,
        }
    }
}

#[derive(Debug)]
struct WorldState {
    pan_us: i32,
    tilt_us: i32,
    frames_rendered: u64,
    shots_fired: usize,
    modes: Vec<ModeCommand>,
    /// (frame number from which the token is deliverable, token)
    tokens: VecDeque<(u64, String)>,
}

/// Shared ground truth of the simulated world
#[derive(Debug, Clone)]
pub struct SimWorld {
    config: Arc<SimConfig>,
    neutral_us: i32,
    state: Arc<Mutex<WorldState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimWorld {
    pub fn new(config: SimConfig, limits: &AxisLimits) -> Self {
        Self {
            config: Arc::new(config),
            neutral_us: limits.neutral_us,
            state: Arc::new(Mutex::new(WorldState {
                pan_us: limits.neutral_us,
                tilt_us: limits.neutral_us,
                frames_rendered: 0,
                shots_fired: 0,
                modes: Vec::new(),
                tokens: VecDeque::new(),
            })),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Have the actuator board send a token once the given frame has been rendered
    pub fn schedule_token(&self, frame: u64, token: &str) {
        let mut state = lock(&self.state);
        state.tokens.push_back((frame, token.to_string()));
        state.tokens.make_contiguous().sort_by_key(|(due, _)| *due);
    }

    /// Servo setpoints last commanded over the link
    pub fn servos(&self) -> (i32, i32) {
        let state = lock(&self.state);
        (state.pan_us, state.tilt_us)
    }

    /// Where the laser currently lands
    pub fn laser_position(&self) -> Point {
        let (pan, tilt) = self.servos();
        let offset = |us: i32| ((us - self.neutral_us) as f64 * self.config.px_per_us).round() as i32;
        Point::new(
            self.config.laser_origin.x - offset(pan),
            self.config.laser_origin.y - offset(tilt),
        )
    }

    /// Target in the scene at a given frame number
    pub fn target_at(&self, frame_number: u64) -> Option<Detection> {
        self.config
            .target
            .filter(|_| frame_number >= self.config.target_appears_at)
    }

    pub fn frames_rendered(&self) -> u64 {
        lock(&self.state).frames_rendered
    }

    pub fn shots_fired(&self) -> usize {
        lock(&self.state).shots_fired
    }

    /// Mode announcements received by the board, in order
    pub fn modes(&self) -> Vec<ModeCommand> {
        lock(&self.state).modes.clone()
    }

    fn render(&self, frame_number: u64) -> Frame {
        let config = &self.config;
        let mut image = Array3::<u8>::zeros((config.height, config.width, 3));

        if let Some(target) = self.target_at(frame_number) {
            let outer = target.radius;
            let inner = (target.radius - RING_THICKNESS).max(0);
            let ring = |d2: i32| d2 <= outer * outer && d2 >= inner * inner;
            paint(&mut image, target.center(), ring, [TARGET_GRAY; 3]);
        }

        let laser = self.laser_position();
        let disc = |d2: i32| d2 <= LASER_RADIUS * LASER_RADIUS;
        paint(&mut image, laser, disc, [255, 0, 0]);

        Frame::new(image, frame_number)
    }
}

/// Paint pixels around `center` whose squared distance passes `inside`
fn paint(image: &mut Array3<u8>, center: Point, inside: impl Fn(i32) -> bool, rgb: [u8; 3]) {
    let (height, width, _) = image.dim();
    for row in 0..height {
        for col in 0..width {
            let dx = col as i32 - center.x;
            let dy = row as i32 - center.y;
            if inside(dx * dx + dy * dy) {
                for (channel, value) in rgb.iter().enumerate() {
                    image[[row, col, channel]] = *value;
                }
            }
        }
    }
}

/// Actuator board stand-in: applies commands to the world and sends scheduled tokens
pub struct SimLink {
    world: SimWorld,
    limits: AxisLimits,
}

impl CommandChannel for SimLink {
    fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        let command: TurretCommand = line
            .parse()
            .map_err(|e| ChannelError::Transport(format!("board rejected {line:?}: {e}")))?;

        let mut state = lock(&self.world.state);
        match command {
            TurretCommand::Pan(us) => state.pan_us = self.limits.clamp(us),
            TurretCommand::Tilt(us) => state.tilt_us = self.limits.clamp(us),
            TurretCommand::Fire => {
                state.shots_fired += 1;
                log::debug!("Simulated shot {} fired", state.shots_fired);
            }
            TurretCommand::Mode(mode) => state.modes.push(mode),
        }
        Ok(())
    }

    fn poll_line(&mut self) -> Result<Option<String>, ChannelError> {
        let mut state = lock(&self.world.state);
        let rendered = state.frames_rendered;
        let ready = matches!(state.tokens.front(), Some((due, _)) if *due <= rendered);
        if ready {
            Ok(state.tokens.pop_front().map(|(_, token)| token))
        } else {
            Ok(None)
        }
    }

    fn clear_input(&mut self) -> Result<(), ChannelError> {
        let mut state = lock(&self.world.state);
        let rendered = state.frames_rendered;
        state.tokens.retain(|(due, _)| *due > rendered);
        Ok(())
    }
}

/// Camera stand-in rendering the world once per frame interval
pub struct SimFrames {
    world: SimWorld,
    clock: ManualClock,
}

impl FrameSource for SimFrames {
    fn next_frame(&mut self) -> Option<Frame> {
        self.clock.sleep(self.world.config.frame_interval);
        let frame_number = {
            let mut state = lock(&self.world.state);
            state.frames_rendered += 1;
            state.frames_rendered
        };
        Some(self.world.render(frame_number))
    }
}

/// Ring detector that reads scene truth, with seeded misses and position noise
pub struct SimShapes {
    world: SimWorld,
    rng: ChaCha8Rng,
}

impl ShapeDetector for SimShapes {
    fn detect(&mut self, frame: &Frame) -> Option<Detection> {
        let target = self.world.target_at(frame.frame_number)?;
        let config = self.world.config();

        if config.dropout_probability > 0.0 && self.rng.gen_bool(config.dropout_probability) {
            return None;
        }

        let jitter = config.jitter_px;
        if jitter == 0 {
            return Some(target);
        }
        Some(Detection::new(
            target.x + self.rng.gen_range(-jitter..=jitter),
            target.y + self.rng.gen_range(-jitter..=jitter),
            target.radius,
        ))
    }
}

/// A rig wired to a simulated world, plus handles to inspect it
pub struct Simulation {
    pub rig: Rig,
    pub world: SimWorld,
    pub clock: ManualClock,
}

impl Simulation {
    pub fn new(config: SimConfig, limits: &AxisLimits, link: &LinkConfig) -> Self {
        let seed = config.seed;
        let world = SimWorld::new(config, limits);
        let clock = ManualClock::new();

        let rig = Rig::new(
            Box::new(SimFrames {
                world: world.clone(),
                clock: clock.clone(),
            }),
            Box::new(SimShapes {
                world: world.clone(),
                rng: ChaCha8Rng::seed_from_u64(seed),
            }),
            Box::new(RedSpotDetector::default()),
            Box::new(SimLink {
                world: world.clone(),
                limits: *limits,
            }),
            Arc::new(clock.clone()),
            link,
        );

        Self { rig, world, clock }
    }
}
