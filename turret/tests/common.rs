//! Common utilities for turret integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use turret::mock::{BlankFrames, ManualClock, RecordingChannel, ScriptedShapes, ScriptedSpots};
use turret::{Rig, Turret, TurretCallbackEvent, TurretConfig};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A rig wired to scripted collaborators, plus handles to steer and inspect them
pub struct TestBench {
    pub rig: Rig,
    pub channel: RecordingChannel,
    pub clock: ManualClock,
    pub frames: BlankFrames,
    pub shapes: ScriptedShapes,
    pub spots: ScriptedSpots,
}

impl TestBench {
    pub fn new(shapes: ScriptedShapes, spots: ScriptedSpots) -> Self {
        Self::with_frames(BlankFrames::new(320, 240), shapes, spots)
    }

    pub fn with_frames(frames: BlankFrames, shapes: ScriptedShapes, spots: ScriptedSpots) -> Self {
        init_logging();
        let channel = RecordingChannel::new();
        let clock = ManualClock::new();
        let rig = Rig::new(
            Box::new(frames.clone()),
            Box::new(shapes.clone()),
            Box::new(spots.clone()),
            Box::new(channel.clone()),
            Arc::new(clock.clone()),
            &TurretConfig::default().link,
        );
        Self {
            rig,
            channel,
            clock,
            frames,
            shapes,
            spots,
        }
    }

    /// Lines sent that match a given prefix, e.g. `"MODE="`
    pub fn sent_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.channel
            .sent_lines()
            .into_iter()
            .filter(|line| line.starts_with(prefix))
            .collect()
    }

    pub fn last_sent(&self) -> Option<String> {
        self.channel.sent_lines().last().cloned()
    }
}

/// Record every callback event the controller emits
pub fn collect_events(turret: &Turret) -> Arc<Mutex<Vec<TurretCallbackEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    turret.register_callback(move |event| {
        events_clone.lock().unwrap().push(event.clone());
    });
    events
}

/// All `ScanFinished` events as (found, interrupted, pan_us)
pub fn scan_results(events: &Mutex<Vec<TurretCallbackEvent>>) -> Vec<(bool, bool, i32)> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            TurretCallbackEvent::ScanFinished {
                found,
                interrupted,
                pan_us,
            } => Some((*found, *interrupted, *pan_us)),
            _ => None,
        })
        .collect()
}
