//! Runner for executing the turret controller against a rig
//!
//! Drives the controller tick by tick, collecting callback events and a few
//! counters into [`RunnerResults`].

use std::sync::{Arc, Mutex};

use turret::{EngagementMode, Rig, TickOutcome, Turret, TurretCallbackEvent, TurretError};

/// Results from a runner execution
#[derive(Debug, Clone)]
pub struct RunnerResults {
    /// Control loop iterations executed
    pub ticks: usize,
    /// Frames the main loop pulled from the camera
    pub frames_seen: u64,
    /// Frames the camera failed to deliver
    pub frames_skipped: u64,
    /// Ticks spent aligning
    pub ticks_aligning: usize,
    /// Fire commands issued
    pub shots_fired: usize,
    /// Final controller mode
    pub final_mode: EngagementMode,
    /// Whether the controller shut down on its own
    pub shut_down: bool,
    /// All events emitted during the run
    pub events: Vec<TurretCallbackEvent>,
}

impl RunnerResults {
    /// All `ScanFinished` events as (found, interrupted)
    pub fn scans(&self) -> Vec<(bool, bool)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TurretCallbackEvent::ScanFinished {
                    found, interrupted, ..
                } => Some((*found, *interrupted)),
                _ => None,
            })
            .collect()
    }
}

/// Run the handshake and then tick until shutdown or `max_ticks`
pub fn run_engagement(
    turret: &mut Turret,
    rig: &mut Rig,
    max_ticks: usize,
) -> Result<RunnerResults, TurretError> {
    turret.startup(rig)?;
    Ok(run_until(turret, rig, max_ticks, |_| false))
}

/// Tick until shutdown, `max_ticks`, or `stop` returns true after a tick
///
/// Does not run the startup handshake.
pub fn run_until<F>(turret: &mut Turret, rig: &mut Rig, max_ticks: usize, mut stop: F) -> RunnerResults
where
    F: FnMut(&Turret) -> bool,
{
    // Set up event collection
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let callback_id = turret.register_callback(move |event| {
        if let Ok(mut events) = events_clone.lock() {
            events.push(event.clone());
        }
    });

    let frames_seen_before = turret.frames_seen();
    let frames_skipped_before = turret.frames_skipped();
    let mut ticks = 0;
    let mut ticks_aligning = 0;
    let mut shut_down = false;

    while ticks < max_ticks {
        ticks += 1;
        if turret.tick(rig) == TickOutcome::Shutdown {
            shut_down = true;
            break;
        }
        if matches!(turret.mode(), EngagementMode::Aligning { .. }) {
            ticks_aligning += 1;
        }
        if stop(turret) {
            break;
        }
    }

    // Deregister the callback to avoid leaking resources
    turret.deregister_callback(callback_id);

    let events = events
        .lock()
        .map(|events| events.clone())
        .unwrap_or_default();
    let shots_fired = events
        .iter()
        .filter(|event| matches!(event, TurretCallbackEvent::Fired { .. }))
        .count();

    log::info!(
        "Run finished after {ticks} ticks in {} ({shots_fired} shots)",
        turret.mode().name()
    );

    RunnerResults {
        ticks,
        frames_seen: turret.frames_seen() - frames_seen_before,
        frames_skipped: turret.frames_skipped() - frames_skipped_before,
        ticks_aligning,
        shots_fired,
        final_mode: turret.mode().clone(),
        shut_down,
        events,
    }
}
