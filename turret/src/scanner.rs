//! Exploration scan
//!
//! Sweeps the pan axis one step at a time through the configured waypoints,
//! running the raw shape detector on one frame per step. A target counts as
//! found once enough consecutive large detections land close together. Every
//! step checks for operator interrupts before moving.

use crate::axes::ServoAxes;
use crate::config::ScanConfig;
use crate::detection::Detection;
use crate::events::{OperatorEvent, QueuedEvent};
use crate::protocol::{ModeCommand, TurretCommand};
use crate::rig::Rig;

/// Outcome of an exploration scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    pub found: bool,
    /// Interrupt that aborted the scan, if any
    pub interrupted_by: Option<OperatorEvent>,
    /// Detection that completed the confirmation streak
    pub target: Option<Detection>,
}

impl ScanResult {
    fn found(target: Detection) -> Self {
        Self {
            found: true,
            interrupted_by: None,
            target: Some(target),
        }
    }

    fn not_found() -> Self {
        Self {
            found: false,
            interrupted_by: None,
            target: None,
        }
    }

    fn aborted(event: OperatorEvent) -> Self {
        Self {
            found: false,
            interrupted_by: Some(event),
            target: None,
        }
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted_by.is_some()
    }
}

/// Debounce for scan detections
///
/// Independent of the tracking filter: tighter match radius, explicit streak
/// length, and any miss restarts the streak.
#[derive(Debug, Clone)]
pub struct ConfirmationCounter {
    min_radius_px: i32,
    match_radius_px: f64,
    required: u32,
    streak: u32,
    last: Option<Detection>,
}

impl ConfirmationCounter {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            min_radius_px: config.min_radius_px,
            match_radius_px: config.match_radius_px,
            required: config.required_confirmations,
            streak: 0,
            last: None,
        }
    }

    /// Feed one frame's raw detection, returning true once the target is confirmed
    pub fn observe(&mut self, detection: Option<Detection>) -> bool {
        let Some(detection) = detection.filter(|d| d.radius >= self.min_radius_px) else {
            self.reset();
            return false;
        };

        self.streak = match &self.last {
            Some(last) if detection.distance_to(last) < self.match_radius_px => self.streak + 1,
            _ => 1,
        };
        self.last = Some(detection);

        self.streak >= self.required
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn reset(&mut self) {
        self.streak = 0;
        self.last = None;
    }
}

/// Waypoint sweep driver
#[derive(Debug, Clone)]
pub struct ExplorationScanner {
    config: ScanConfig,
    counter: ConfirmationCounter,
}

impl ExplorationScanner {
    pub fn new(config: ScanConfig) -> Self {
        let counter = ConfirmationCounter::new(&config);
        Self { config, counter }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run a full scan
    ///
    /// Recenters the pan axis, then steps toward each waypoint in turn. Emits
    /// `MODE=LOCK` or `MODE=FREE` on completion, or `MODE=FREE` / `MODE=OFF`
    /// when interrupted. Waypoints outside the axis limits are cut short at
    /// the nearest limit.
    pub fn scan(&mut self, axes: &mut ServoAxes, rig: &mut Rig) -> ScanResult {
        self.counter.reset();

        let neutral = axes.limits().neutral_us;
        let pan = axes.set_pan(neutral);
        rig.link.send(TurretCommand::Pan(pan));
        rig.clock.sleep(self.config.settle_delay());

        let result = self.sweep(axes, rig);

        match result.interrupted_by {
            Some(_) => {}
            None if result.found => {
                log::info!(
                    "Target confirmed during scan at pan {} us: {:?}",
                    axes.pan(),
                    result.target
                );
                rig.link.send(TurretCommand::Mode(ModeCommand::Lock));
            }
            None => {
                log::info!("Scan finished without a target");
                rig.link.send(TurretCommand::Mode(ModeCommand::Free));
            }
        }
        result
    }

    fn sweep(&mut self, axes: &mut ServoAxes, rig: &mut Rig) -> ScanResult {
        let total = self.config.waypoints_us.len();
        let step_us = self.config.step_us.max(1);
        for (index, &requested) in self.config.waypoints_us.iter().enumerate() {
            let waypoint = axes.limits().clamp(requested);
            if waypoint != requested {
                log::warn!("Waypoint {requested} us is out of range, stopping at {waypoint} us");
            }
            log::debug!("Scanning toward waypoint {}/{total} ({waypoint} us)", index + 1);

            while axes.pan() != waypoint {
                rig.events.pump(&mut rig.link);
                if let Some(interrupt) = rig.events.take_interrupt() {
                    return Self::abort(interrupt, rig);
                }

                let step = (waypoint - axes.pan()).clamp(-step_us, step_us);
                let pan = axes.nudge_pan(step);
                rig.link.send(TurretCommand::Pan(pan));
                rig.clock.sleep(self.config.step_delay());

                let Some(frame) = rig.frames.next_frame() else {
                    continue;
                };
                let detection = rig.shapes.detect(&frame);
                if self.counter.observe(detection) {
                    if let Some(target) = detection {
                        return ScanResult::found(target);
                    }
                }
            }
        }
        ScanResult::not_found()
    }

    fn abort(interrupt: QueuedEvent, rig: &mut Rig) -> ScanResult {
        let mode = match interrupt.event {
            OperatorEvent::Quit => ModeCommand::Off,
            _ => ModeCommand::Free,
        };
        log::info!(
            "Scan interrupted by {:?} from {:?}",
            interrupt.event,
            interrupt.origin
        );
        rig.link.send(TurretCommand::Mode(mode));
        ScanResult::aborted(interrupt.event)
    }
}
