use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TurretError;

/// Servo pulse-width limits shared by both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLimits {
    /// Lowest pulse width the servos accept (µs)
    pub min_us: i32,
    /// Highest pulse width the servos accept (µs)
    pub max_us: i32,
    /// Centered position used at startup and at the start of every scan (µs)
    pub neutral_us: i32,
}

impl AxisLimits {
    /// Clamp a pulse width into the allowed range
    pub fn clamp(&self, value_us: i32) -> i32 {
        value_us.clamp(self.min_us, self.max_us)
    }

    /// Check whether a pulse width lies inside the allowed range
    pub fn contains(&self, value_us: i32) -> bool {
        (self.min_us..=self.max_us).contains(&value_us)
    }
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self {
            min_us: 500,
            max_us: 2500,
            neutral_us: 1500,
        }
    }
}

/// Parameters of the per-frame target confidence filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingFilterConfig {
    /// Detections closer than this to the previous target continue the track (pixels)
    pub match_radius_px: f64,
    /// Confidence ceiling
    pub max_confidence: u32,
    /// Consecutive missed frames after which the target is dropped
    pub lost_frame_limit: u32,
}

impl Default for TrackingFilterConfig {
    fn default() -> Self {
        Self {
            match_radius_px: 20.0,
            max_confidence: 10,
            lost_frame_limit: 5,
        }
    }
}

/// Exploration scan parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Pan setpoints visited in order (µs)
    pub waypoints_us: Vec<i32>,
    /// Smallest circle radius that counts as a confirmation (pixels)
    pub min_radius_px: i32,
    /// Consecutive confirmations must land within this distance of each other (pixels)
    pub match_radius_px: f64,
    /// Consecutive confirmations needed to declare a target found
    pub required_confirmations: u32,
    /// Pan increment per scan step (µs)
    pub step_us: i32,
    /// Wait after each step before grabbing a frame (ms)
    pub step_delay_ms: u64,
    /// Wait after recentering the pan axis before the first step (ms)
    pub settle_delay_ms: u64,
}

impl ScanConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            waypoints_us: vec![1500, 1700, 1500, 1300, 1500],
            min_radius_px: 38,
            match_radius_px: 10.0,
            required_confirmations: 3,
            step_us: 1,
            step_delay_ms: 2,
            settle_delay_ms: 10,
        }
    }
}

/// Direction in which a positive image offset drives an axis
///
/// With `Normal`, a positive offset (target right of / below the laser) is corrected by
/// decreasing the pulse width. This depends on how the servos are mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AxisPolarity {
    #[default]
    Normal,
    Inverted,
}

impl AxisPolarity {
    /// Sign applied to the pulse-width correction for a positive offset
    pub fn correction_sign(&self) -> i32 {
        match self {
            AxisPolarity::Normal => -1,
            AxisPolarity::Inverted => 1,
        }
    }
}

/// Laser-onto-target alignment parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Offsets up to and including this value count as aligned (pixels)
    pub tolerance_px: i32,
    /// Pulse-width correction per frame (µs)
    pub step_us: i32,
    pub pan_polarity: AxisPolarity,
    pub tilt_polarity: AxisPolarity,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            tolerance_px: 8,
            step_us: 1,
            pan_polarity: AxisPolarity::Normal,
            tilt_polarity: AxisPolarity::Normal,
        }
    }
}

/// Outbound command link parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Minimum spacing between two outbound commands (ms)
    pub min_send_interval_ms: u64,
    /// Wait before and after flushing stale inbound data at startup (ms)
    pub handshake_settle_ms: u64,
}

impl LinkConfig {
    pub fn min_send_interval(&self) -> Duration {
        Duration::from_millis(self.min_send_interval_ms)
    }

    pub fn handshake_settle(&self) -> Duration {
        Duration::from_millis(self.handshake_settle_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            min_send_interval_ms: 1,
            handshake_settle_ms: 1000,
        }
    }
}

/// Dwell times of the fire sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementTiming {
    /// Time between the fire warning and the fire command (ms)
    pub fire_warn_dwell_ms: u64,
    /// Time between the fire command and the return to FREE (ms)
    pub fired_dwell_ms: u64,
    /// Minimum spacing between "target hit" acknowledgements (ms)
    pub hit_ack_interval_ms: u64,
}

impl EngagementTiming {
    pub fn fire_warn_dwell(&self) -> Duration {
        Duration::from_millis(self.fire_warn_dwell_ms)
    }

    pub fn fired_dwell(&self) -> Duration {
        Duration::from_millis(self.fired_dwell_ms)
    }

    pub fn hit_ack_interval(&self) -> Duration {
        Duration::from_millis(self.hit_ack_interval_ms)
    }
}

impl Default for EngagementTiming {
    fn default() -> Self {
        Self {
            fire_warn_dwell_ms: 1000,
            fired_dwell_ms: 1000,
            hit_ack_interval_ms: 1000,
        }
    }
}

/// Configuration for the turret controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TurretConfig {
    pub axes: AxisLimits,
    pub tracking: TrackingFilterConfig,
    pub scan: ScanConfig,
    pub alignment: AlignmentConfig,
    pub link: LinkConfig,
    pub timing: EngagementTiming,
}

impl TurretConfig {
    /// Load a configuration from a JSON file
    ///
    /// Missing sections fall back to their defaults. The result is validated.
    pub fn load_from_file(path: &Path) -> Result<Self, TurretError> {
        let contents = std::fs::read_to_string(path).map_err(|source| TurretError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TurretConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), TurretError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| TurretError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), TurretError> {
        let axes = &self.axes;
        if axes.min_us >= axes.max_us {
            return Err(TurretError::InvalidConfig(format!(
                "axis range is empty: min {} >= max {}",
                axes.min_us, axes.max_us
            )));
        }
        if !axes.contains(axes.neutral_us) {
            return Err(TurretError::InvalidConfig(format!(
                "neutral position {} outside [{}, {}]",
                axes.neutral_us, axes.min_us, axes.max_us
            )));
        }

        if self.scan.waypoints_us.is_empty() {
            return Err(TurretError::InvalidConfig(
                "scan needs at least one waypoint".to_string(),
            ));
        }
        // The pan axis is clamped, so an out-of-range waypoint would never be reached
        if let Some(bad) = self
            .scan
            .waypoints_us
            .iter()
            .find(|&&waypoint| !axes.contains(waypoint))
        {
            return Err(TurretError::InvalidConfig(format!(
                "scan waypoint {bad} outside [{}, {}]",
                axes.min_us, axes.max_us
            )));
        }
        if self.scan.step_us <= 0 {
            return Err(TurretError::InvalidConfig(
                "scan step must be positive".to_string(),
            ));
        }
        if self.scan.required_confirmations == 0 {
            return Err(TurretError::InvalidConfig(
                "scan needs at least one confirmation".to_string(),
            ));
        }

        if self.tracking.lost_frame_limit == 0 {
            return Err(TurretError::InvalidConfig(
                "lost frame limit must be at least 1".to_string(),
            ));
        }
        if self.tracking.max_confidence == 0 {
            return Err(TurretError::InvalidConfig(
                "confidence ceiling must be at least 1".to_string(),
            ));
        }

        if self.alignment.step_us <= 0 {
            return Err(TurretError::InvalidConfig(
                "alignment step must be positive".to_string(),
            ));
        }
        if self.alignment.tolerance_px < 0 {
            return Err(TurretError::InvalidConfig(
                "alignment tolerance cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}
