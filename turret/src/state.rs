use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engagement modes of the turret controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngagementMode {
    /// Idle, waiting for a scan request
    Free,
    /// Operator has the turret; nothing automated runs
    Manual,
    /// Exploration scan in progress
    Scanning,
    /// Scan confirmed a target, alignment starts with the next frame
    Locked,
    /// Driving the laser dot onto the target
    Aligning { frames_processed: usize },
    /// Fire warning issued, waiting out the dwell
    FireWarn { since: Duration },
    /// Fire command issued; detection is suppressed until the dwell ends
    Fired {
        since: Duration,
        last_ack: Duration,
    },
    /// Controller shut down
    Off,
}

impl EngagementMode {
    /// Whether the one-shot fired latch is set
    pub fn fired_latch(&self) -> bool {
        matches!(self, EngagementMode::Fired { .. })
    }

    /// Whether a fire sequence is under way (warning or fired)
    pub fn is_engaging(&self) -> bool {
        matches!(
            self,
            EngagementMode::FireWarn { .. } | EngagementMode::Fired { .. }
        )
    }

    /// Whether frames are used for closed-loop alignment in this mode
    pub fn is_tracking(&self) -> bool {
        matches!(
            self,
            EngagementMode::Locked | EngagementMode::Aligning { .. }
        )
    }

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            EngagementMode::Free => "FREE",
            EngagementMode::Manual => "MANUAL",
            EngagementMode::Scanning => "SCAN",
            EngagementMode::Locked => "LOCK",
            EngagementMode::Aligning { .. } => "ALIGNING",
            EngagementMode::FireWarn { .. } => "FIRE_WARN",
            EngagementMode::Fired { .. } => "FIRED",
            EngagementMode::Off => "OFF",
        }
    }
}
