use std::sync::Arc;

use crate::filters::TrackedTarget;
use crate::state::EngagementMode;

/// Events emitted for external callbacks
#[derive(Debug, Clone)]
pub enum TurretCallbackEvent {
    /// Controller changed mode
    ModeChanged {
        from: EngagementMode,
        to: EngagementMode,
    },
    /// Exploration scan returned
    ScanFinished {
        found: bool,
        interrupted: bool,
        pan_us: i32,
    },
    /// Confidence filter dropped the target after too many missed frames
    TargetLost { last_target: TrackedTarget },
    /// Alignment step computed from a frame with both target and laser visible
    AlignmentUpdate {
        dx: i32,
        dy: i32,
        pan_us: i32,
        tilt_us: i32,
    },
    /// Fire command issued
    Fired { pan_us: i32, tilt_us: i32 },
    /// Periodic acknowledgement while the fired latch is set
    TargetHit,
}

/// Callback ID for registration/deregistration
pub type CallbackId = u64;

/// Callback function type
pub type TurretCallback = Arc<dyn Fn(&TurretCallbackEvent) + Send + Sync>;
