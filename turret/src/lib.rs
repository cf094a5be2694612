//! Laser turret engagement controller
//!
//! Drives a pan/tilt servo turret with a laser from camera frames: an
//! exploration scan finds a circular target, a per-frame confidence filter
//! keeps it stable, and a bang-bang alignment loop walks the laser dot onto it
//! before a timed warn/fire sequence. Modes: Free -> Scanning -> Locked ->
//! Aligning -> FireWarn -> Fired -> Free, with operator interrupts at any time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod axes;
pub mod callback;
pub mod clock;
pub mod config;
pub mod controllers;
pub mod detection;
pub mod error;
pub mod events;
pub mod filters;
pub mod link;
pub mod mock;
pub mod protocol;
pub mod rig;
pub mod scanner;
pub mod state;

use crate::axes::ServoAxes;
use crate::callback::{CallbackId, TurretCallback};
use crate::controllers::AlignmentController;
use crate::detection::Frame;
use crate::events::QueuedEvent;
use crate::filters::{ConfidenceFilter, TrackedTarget};
use crate::protocol::ModeCommand;
use crate::scanner::{ExplorationScanner, ScanResult};

// Re-export commonly used types for external use
pub use crate::callback::TurretCallbackEvent;
pub use crate::config::TurretConfig;
pub use crate::error::TurretError;
pub use crate::events::OperatorEvent;
pub use crate::protocol::TurretCommand;
pub use crate::rig::Rig;
pub use crate::state::EngagementMode;

/// Whether the control loop should keep going after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Shutdown,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Main engagement state machine
///
/// Owns the servo setpoints, the mode and the tracking state. It is the only
/// thing that sends commands to the actuator board, always through the rig's
/// `CommandLink`.
pub struct Turret {
    /// Current mode
    mode: EngagementMode,
    /// System configuration
    config: TurretConfig,
    /// Servo setpoints
    axes: ServoAxes,
    /// Target persistence across frames
    filter: ConfidenceFilter,
    scanner: ExplorationScanner,
    alignment: AlignmentController,
    /// Registered callbacks
    callbacks: Arc<Mutex<HashMap<CallbackId, TurretCallback>>>,
    /// Next callback ID
    next_callback_id: Arc<Mutex<CallbackId>>,
    /// Frames pulled from the camera by the main loop
    frames_seen: u64,
    /// Frames the camera failed to deliver
    frames_skipped: u64,
}

impl Turret {
    /// Create a controller from a validated configuration
    pub fn new(config: TurretConfig) -> Result<Self, TurretError> {
        config.validate()?;
        Ok(Self {
            mode: EngagementMode::Free,
            axes: ServoAxes::new(config.axes),
            filter: ConfidenceFilter::new(config.tracking.clone()),
            scanner: ExplorationScanner::new(config.scan.clone()),
            alignment: AlignmentController::new(config.alignment.clone()),
            config,
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            next_callback_id: Arc::new(Mutex::new(0)),
            frames_seen: 0,
            frames_skipped: 0,
        })
    }

    /// Register a callback for controller events
    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&TurretCallbackEvent) + Send + Sync + 'static,
    {
        let mut callbacks = lock(&self.callbacks);
        let mut next_id = lock(&self.next_callback_id);

        let callback_id = *next_id;
        *next_id += 1;

        callbacks.insert(callback_id, Arc::new(callback));
        callback_id
    }

    /// Deregister a callback
    pub fn deregister_callback(&self, callback_id: CallbackId) -> bool {
        lock(&self.callbacks).remove(&callback_id).is_some()
    }

    /// Get the number of registered callbacks
    pub fn callback_count(&self) -> usize {
        lock(&self.callbacks).len()
    }

    /// Emit an event to all registered callbacks
    fn emit_event(&self, event: &TurretCallbackEvent) {
        let callbacks: Vec<TurretCallback> = lock(&self.callbacks).values().cloned().collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn mode(&self) -> &EngagementMode {
        &self.mode
    }

    pub fn config(&self) -> &TurretConfig {
        &self.config
    }

    pub fn axes(&self) -> &ServoAxes {
        &self.axes
    }

    /// Target currently held by the confidence filter
    pub fn tracked_target(&self) -> Option<TrackedTarget> {
        self.filter.current()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Flush stale input on the actuator link and announce FREE mode
    pub fn startup(&mut self, rig: &mut Rig) -> Result<(), TurretError> {
        rig.link.handshake()?;
        log::info!(
            "Turret controller started at pan {} us, tilt {} us",
            self.axes.pan(),
            self.axes.tilt()
        );
        Ok(())
    }

    /// Run the handshake and then the control loop until quit
    pub fn run(&mut self, rig: &mut Rig) -> Result<(), TurretError> {
        self.startup(rig)?;
        while self.tick(rig) == TickOutcome::Continue {}
        log::info!(
            "Turret controller stopped after {} frames ({} unreadable)",
            self.frames_seen,
            self.frames_skipped
        );
        Ok(())
    }

    /// One iteration of the control loop
    ///
    /// Handles pending operator events, advances the fire dwells, then pulls
    /// one frame and runs alignment on it when tracking.
    pub fn tick(&mut self, rig: &mut Rig) -> TickOutcome {
        if self.mode == EngagementMode::Off {
            return TickOutcome::Shutdown;
        }

        rig.events.pump(&mut rig.link);
        while let Some(queued) = rig.events.pop() {
            self.handle_event(queued, rig);
            if self.mode == EngagementMode::Off {
                return TickOutcome::Shutdown;
            }
        }

        self.advance_dwell(rig);

        let Some(frame) = rig.frames.next_frame() else {
            self.frames_skipped += 1;
            log::debug!("No frame available, skipping");
            return TickOutcome::Continue;
        };
        self.frames_seen += 1;

        if self.mode.is_tracking() {
            self.handle_alignment_frame(&frame, rig);
        }
        TickOutcome::Continue
    }

    /// Apply one operator request
    pub fn handle_event(&mut self, queued: QueuedEvent, rig: &mut Rig) {
        log::debug!(
            "Handling {:?} from {:?} in {}",
            queued.event,
            queued.origin,
            self.mode.name()
        );

        match (&self.mode, queued.event) {
            (_, OperatorEvent::Quit) => {
                rig.link.send(TurretCommand::Mode(ModeCommand::Off));
                self.transition(EngagementMode::Off);
            }
            (_, OperatorEvent::ForceFree) => {
                rig.link.send(TurretCommand::Mode(ModeCommand::Free));
                self.filter.reset();
                self.transition(EngagementMode::Free);
            }
            (mode, event) if mode.is_engaging() => {
                log::info!("Ignoring {event:?} during the fire sequence");
            }
            (EngagementMode::Scanning, OperatorEvent::ScanRequest) => {
                log::debug!("Scan already running");
            }
            (_, OperatorEvent::ScanRequest) => {
                self.run_scan(rig);
            }
            (EngagementMode::Manual, OperatorEvent::Manual) => {
                log::debug!("Already in manual mode");
            }
            (_, OperatorEvent::Manual) => {
                rig.link.send(TurretCommand::Mode(ModeCommand::Manual));
                self.filter.reset();
                self.transition(EngagementMode::Manual);
            }
        }
    }

    fn run_scan(&mut self, rig: &mut Rig) -> ScanResult {
        rig.link.send(TurretCommand::Mode(ModeCommand::Scan));
        self.filter.reset();
        self.transition(EngagementMode::Scanning);

        let result = self.scanner.scan(&mut self.axes, rig);
        self.emit_event(&TurretCallbackEvent::ScanFinished {
            found: result.found,
            interrupted: result.interrupted(),
            pan_us: self.axes.pan(),
        });

        let next = match result.interrupted_by {
            Some(OperatorEvent::Quit) => EngagementMode::Off,
            Some(_) => EngagementMode::Free,
            None if result.found => EngagementMode::Locked,
            None => EngagementMode::Free,
        };
        self.transition(next);
        result
    }

    fn handle_alignment_frame(&mut self, frame: &Frame, rig: &mut Rig) {
        let previous = self.filter.current();
        let target = self.filter.update(rig.shapes.detect(frame));
        if let (Some(last_target), None) = (previous, target) {
            log::info!(
                "Lost target at ({}, {}) after {} missed frames",
                last_target.x,
                last_target.y,
                self.filter.lost_count()
            );
            self.emit_event(&TurretCallbackEvent::TargetLost { last_target });
        }

        let laser = rig.spots.detect(frame);
        let step = self.alignment.step(target.as_ref(), laser);

        if step.pan_delta != 0 {
            let pan = self.axes.nudge_pan(step.pan_delta);
            rig.link.send(TurretCommand::Pan(pan));
        }
        if step.tilt_delta != 0 {
            let tilt = self.axes.nudge_tilt(step.tilt_delta);
            rig.link.send(TurretCommand::Tilt(tilt));
        }

        if let Some((dx, dy)) = step.offset {
            self.emit_event(&TurretCallbackEvent::AlignmentUpdate {
                dx,
                dy,
                pan_us: self.axes.pan(),
                tilt_us: self.axes.tilt(),
            });
        }

        if step.converged {
            log::info!(
                "Laser on target at pan {} us, tilt {} us, warning before fire",
                self.axes.pan(),
                self.axes.tilt()
            );
            rig.link.send(TurretCommand::Mode(ModeCommand::FireWarn));
            self.transition(EngagementMode::FireWarn {
                since: rig.clock.now(),
            });
            return;
        }

        let frames_processed = match self.mode {
            EngagementMode::Aligning { frames_processed } => frames_processed + 1,
            _ => 1,
        };
        self.transition(EngagementMode::Aligning { frames_processed });
    }

    fn advance_dwell(&mut self, rig: &mut Rig) {
        let timing = &self.config.timing;
        match self.mode {
            EngagementMode::FireWarn { since }
                if rig.clock.now().saturating_sub(since) >= timing.fire_warn_dwell() =>
            {
                rig.link.send(TurretCommand::Fire);
                let now = rig.clock.now();
                log::info!(
                    "Fired at pan {} us, tilt {} us",
                    self.axes.pan(),
                    self.axes.tilt()
                );
                self.emit_event(&TurretCallbackEvent::Fired {
                    pan_us: self.axes.pan(),
                    tilt_us: self.axes.tilt(),
                });
                self.transition(EngagementMode::Fired {
                    since: now,
                    last_ack: now,
                });
                self.emit_event(&TurretCallbackEvent::TargetHit);
            }
            EngagementMode::Fired { since, .. }
                if rig.clock.now().saturating_sub(since) >= timing.fired_dwell() =>
            {
                rig.link.send(TurretCommand::Mode(ModeCommand::Free));
                self.filter.reset();
                self.transition(EngagementMode::Free);
            }
            EngagementMode::Fired { since, last_ack }
                if rig.clock.now().saturating_sub(last_ack) >= timing.hit_ack_interval() =>
            {
                log::info!("Target hit");
                self.emit_event(&TurretCallbackEvent::TargetHit);
                self.mode = EngagementMode::Fired {
                    since,
                    last_ack: rig.clock.now(),
                };
            }
            _ => {}
        }
    }

    /// Switch mode, logging and notifying callbacks when the kind of mode changes
    fn transition(&mut self, to: EngagementMode) {
        let from = std::mem::replace(&mut self.mode, to);
        if std::mem::discriminant(&from) != std::mem::discriminant(&self.mode) {
            log::info!("Mode {} -> {}", from.name(), self.mode.name());
            self.emit_event(&TurretCallbackEvent::ModeChanged {
                from,
                to: self.mode.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::config::AxisLimits;
    use crate::detection::{Detection, Point};
    use crate::events::EventOrigin;
    use crate::mock::{BlankFrames, ManualClock, RecordingChannel, ScriptedShapes, ScriptedSpots};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Bench {
        rig: Rig,
        channel: RecordingChannel,
        clock: ManualClock,
        shapes: ScriptedShapes,
        spots: ScriptedSpots,
    }

    fn bench(shapes: ScriptedShapes, spots: ScriptedSpots) -> Bench {
        let channel = RecordingChannel::new();
        let clock = ManualClock::new();
        let rig = Rig::new(
            Box::new(BlankFrames::new(32, 24)),
            Box::new(shapes.clone()),
            Box::new(spots.clone()),
            Box::new(channel.clone()),
            Arc::new(clock.clone()),
            &TurretConfig::default().link,
        );
        Bench {
            rig,
            channel,
            clock,
            shapes,
            spots,
        }
    }

    fn locked_turret() -> Turret {
        let mut turret = Turret::new(TurretConfig::default()).unwrap();
        turret.mode = EngagementMode::Locked;
        turret
    }

    fn record_events(turret: &Turret) -> Arc<Mutex<Vec<TurretCallbackEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        turret.register_callback(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    fn push(bench: &mut Bench, event: OperatorEvent) {
        bench.rig.events.push(event, EventOrigin::Ui);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TurretConfig {
            axes: AxisLimits {
                min_us: 2000,
                max_us: 1000,
                neutral_us: 1500,
            },
            ..TurretConfig::default()
        };
        assert!(matches!(
            Turret::new(config),
            Err(TurretError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_initial_state() {
        let turret = Turret::new(TurretConfig::default()).unwrap();
        assert_eq!(turret.mode(), &EngagementMode::Free);
        assert_eq!((turret.axes().pan(), turret.axes().tilt()), (1500, 1500));
        assert!(turret.tracked_target().is_none());
    }

    #[test]
    fn test_callback_registration() {
        let turret = Turret::new(TurretConfig::default()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let callback_id = turret.register_callback(move |_event| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(turret.callback_count(), 1);

        turret.emit_event(&TurretCallbackEvent::TargetHit);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(turret.deregister_callback(callback_id));
        assert!(!turret.deregister_callback(callback_id));
        turret.emit_event(&TurretCallbackEvent::TargetHit);

        // Counter should not have increased
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(turret.callback_count(), 0);
    }

    #[test]
    fn test_multiple_callbacks() {
        let turret = Turret::new(TurretConfig::default()).unwrap();
        let counter1 = Arc::new(AtomicUsize::new(0));
        let counter2 = Arc::new(AtomicUsize::new(0));
        let c1_clone = counter1.clone();
        let c2_clone = counter2.clone();

        let id1 = turret.register_callback(move |_| {
            c1_clone.fetch_add(1, Ordering::SeqCst);
        });
        let id2 = turret.register_callback(move |_| {
            c2_clone.fetch_add(10, Ordering::SeqCst);
        });
        assert_ne!(id1, id2);

        turret.emit_event(&TurretCallbackEvent::Fired {
            pan_us: 1500,
            tilt_us: 1500,
        });
        assert_eq!(counter1.load(Ordering::SeqCst), 1);
        assert_eq!(counter2.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_startup_flushes_stale_input_and_announces_free() {
        let mut bench = bench(ScriptedShapes::default(), ScriptedSpots::default());
        bench.channel.push_inbound("S");
        let mut turret = Turret::new(TurretConfig::default()).unwrap();

        turret.startup(&mut bench.rig).unwrap();
        assert_eq!(bench.channel.sent_lines(), vec!["MODE=FREE"]);
        assert!(bench.clock.now() >= Duration::from_secs(2));

        // The stale S never starts a scan
        assert_eq!(turret.tick(&mut bench.rig), TickOutcome::Continue);
        assert_eq!(turret.mode(), &EngagementMode::Free);
    }

    #[test]
    fn test_quit_shuts_down() {
        let mut bench = bench(ScriptedShapes::default(), ScriptedSpots::default());
        let mut turret = Turret::new(TurretConfig::default()).unwrap();
        push(&mut bench, OperatorEvent::Quit);

        assert_eq!(turret.tick(&mut bench.rig), TickOutcome::Shutdown);
        assert_eq!(turret.mode(), &EngagementMode::Off);
        assert_eq!(bench.channel.sent_lines(), vec!["MODE=OFF"]);
        assert_eq!(turret.tick(&mut bench.rig), TickOutcome::Shutdown);
    }

    #[test]
    fn test_manual_mode_suspends_alignment() {
        let mut bench = bench(
            ScriptedShapes::constant(Detection::new(250, 150, 40)),
            ScriptedSpots::constant(Point::new(200, 150)),
        );
        let mut turret = locked_turret();
        turret.tick(&mut bench.rig);
        assert!(matches!(turret.mode(), EngagementMode::Aligning { .. }));

        push(&mut bench, OperatorEvent::Manual);
        turret.tick(&mut bench.rig);
        assert_eq!(turret.mode(), &EngagementMode::Manual);
        assert!(turret.tracked_target().is_none());

        let spot_calls = bench.spots.calls();
        for _ in 0..5 {
            turret.tick(&mut bench.rig);
        }
        assert_eq!(bench.spots.calls(), spot_calls);
        assert_eq!(
            bench.channel.count(TurretCommand::Mode(ModeCommand::Manual)),
            1
        );
    }

    #[test]
    fn test_alignment_sends_bounded_corrections() {
        let mut bench = bench(
            ScriptedShapes::constant(Detection::new(250, 140, 40)),
            ScriptedSpots::constant(Point::new(200, 150)),
        );
        let mut turret = locked_turret();
        let events = record_events(&turret);

        turret.tick(&mut bench.rig);
        assert_eq!(bench.channel.sent_lines(), vec!["PANU=1499", "TILTU=1501"]);
        assert_eq!(
            turret.mode(),
            &EngagementMode::Aligning {
                frames_processed: 1
            }
        );

        turret.tick(&mut bench.rig);
        assert_eq!((turret.axes().pan(), turret.axes().tilt()), (1498, 1502));
        assert_eq!(
            turret.mode(),
            &EngagementMode::Aligning {
                frames_processed: 2
            }
        );

        let events = events.lock().unwrap();
        let mode_changes = events
            .iter()
            .filter(|event| matches!(event, TurretCallbackEvent::ModeChanged { .. }))
            .count();
        assert_eq!(mode_changes, 1);
        assert!(events.iter().any(|event| matches!(
            event,
            TurretCallbackEvent::AlignmentUpdate { dx: 50, dy: -10, .. }
        )));
    }

    #[test]
    fn test_no_correction_without_laser() {
        let mut bench = bench(
            ScriptedShapes::constant(Detection::new(250, 140, 40)),
            ScriptedSpots::default(),
        );
        let mut turret = locked_turret();
        for _ in 0..3 {
            turret.tick(&mut bench.rig);
        }
        assert!(bench.channel.sent_lines().is_empty());
        assert!(matches!(turret.mode(), EngagementMode::Aligning { .. }));
    }

    #[test]
    fn test_target_lost_reported_once() {
        let shapes = ScriptedShapes::new(vec![Some(Detection::new(100, 100, 40))]);
        let mut bench = bench(shapes, ScriptedSpots::default());
        let mut turret = locked_turret();
        let events = record_events(&turret);

        for _ in 0..10 {
            turret.tick(&mut bench.rig);
        }

        let lost: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                TurretCallbackEvent::TargetLost { last_target } => Some(*last_target),
                _ => None,
            })
            .collect();
        assert_eq!(lost.len(), 1);
        assert_eq!((lost[0].x, lost[0].y), (100, 100));
        assert!(turret.tracked_target().is_none());
        assert_eq!(bench.shapes.calls(), 10);
    }

    #[test]
    fn test_fire_sequence_is_timed_and_fires_once() {
        let mut bench = bench(
            ScriptedShapes::constant(Detection::new(200, 150, 40)),
            ScriptedSpots::constant(Point::new(204, 147)),
        );
        let mut turret = locked_turret();
        let events = record_events(&turret);

        turret.tick(&mut bench.rig);
        assert!(matches!(turret.mode(), EngagementMode::FireWarn { .. }));
        assert_eq!(bench.channel.sent_lines(), vec!["MODE=FIRE_WARN"]);

        bench.clock.advance(Duration::from_millis(999));
        turret.tick(&mut bench.rig);
        assert_eq!(bench.channel.count(TurretCommand::Fire), 0);

        bench.clock.advance(Duration::from_millis(1));
        turret.tick(&mut bench.rig);
        assert!(turret.mode().fired_latch());
        assert_eq!(bench.channel.count(TurretCommand::Fire), 1);

        // Detection is inert while the latch is set
        let shape_calls = bench.shapes.calls();
        turret.tick(&mut bench.rig);
        assert_eq!(bench.shapes.calls(), shape_calls);

        bench.clock.advance(Duration::from_secs(1));
        turret.tick(&mut bench.rig);
        assert_eq!(turret.mode(), &EngagementMode::Free);
        assert_eq!(bench.channel.count(TurretCommand::Fire), 1);
        assert_eq!(
            bench.channel.sent_lines().last().map(String::as_str),
            Some("MODE=FREE")
        );
        assert!(turret.tracked_target().is_none());

        let fired = events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, TurretCallbackEvent::Fired { .. }))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_hit_acknowledged_at_most_once_per_interval() {
        let mut bench = bench(
            ScriptedShapes::constant(Detection::new(200, 150, 40)),
            ScriptedSpots::constant(Point::new(200, 150)),
        );
        let config = TurretConfig {
            timing: crate::config::EngagementTiming {
                fire_warn_dwell_ms: 0,
                fired_dwell_ms: 3500,
                hit_ack_interval_ms: 1000,
            },
            ..TurretConfig::default()
        };
        let mut turret = Turret::new(config).unwrap();
        turret.mode = EngagementMode::Locked;
        let events = record_events(&turret);

        turret.tick(&mut bench.rig);
        turret.tick(&mut bench.rig);
        assert!(turret.mode().fired_latch());
        for _ in 0..40 {
            bench.clock.advance(Duration::from_millis(100));
            turret.tick(&mut bench.rig);
        }
        assert_eq!(turret.mode(), &EngagementMode::Free);

        let hits = events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, TurretCallbackEvent::TargetHit))
            .count();
        // On entry, then at 1 s, 2 s and 3 s into the 3.5 s dwell
        assert_eq!(hits, 4);
    }

    #[test]
    fn test_operator_requests_ignored_during_fire_sequence() {
        let mut bench = bench(
            ScriptedShapes::constant(Detection::new(200, 150, 40)),
            ScriptedSpots::constant(Point::new(200, 150)),
        );
        let mut turret = locked_turret();
        turret.tick(&mut bench.rig);
        assert!(matches!(turret.mode(), EngagementMode::FireWarn { .. }));

        push(&mut bench, OperatorEvent::ScanRequest);
        push(&mut bench, OperatorEvent::Manual);
        turret.tick(&mut bench.rig);
        assert!(matches!(turret.mode(), EngagementMode::FireWarn { .. }));
        assert_eq!(bench.channel.sent_lines(), vec!["MODE=FIRE_WARN"]);
    }

    #[test]
    fn test_force_free_cancels_fire_warning() {
        let mut bench = bench(
            ScriptedShapes::constant(Detection::new(200, 150, 40)),
            ScriptedSpots::constant(Point::new(200, 150)),
        );
        let mut turret = locked_turret();
        turret.tick(&mut bench.rig);

        push(&mut bench, OperatorEvent::ForceFree);
        turret.tick(&mut bench.rig);
        assert_eq!(turret.mode(), &EngagementMode::Free);
        assert!(turret.tracked_target().is_none());

        bench.clock.advance(Duration::from_secs(5));
        turret.tick(&mut bench.rig);
        assert_eq!(bench.channel.count(TurretCommand::Fire), 0);
    }

    #[test]
    fn test_unreadable_frames_are_counted_and_skipped() {
        let channel = RecordingChannel::new();
        let shapes = ScriptedShapes::constant(Detection::new(250, 150, 40));
        let mut rig = Rig::new(
            Box::new(BlankFrames::new(32, 24).with_unreadable([0, 2])),
            Box::new(shapes.clone()),
            Box::new(ScriptedSpots::constant(Point::new(200, 150))),
            Box::new(channel.clone()),
            Arc::new(ManualClock::new()),
            &TurretConfig::default().link,
        );
        let mut turret = locked_turret();

        for _ in 0..4 {
            assert_eq!(turret.tick(&mut rig), TickOutcome::Continue);
        }
        assert_eq!(turret.frames_seen(), 2);
        assert_eq!(turret.frames_skipped(), 2);
        assert_eq!(shapes.calls(), 2);
        assert_eq!(channel.count(TurretCommand::Pan(1498)), 1);
    }
}
