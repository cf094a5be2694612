//! Commanded pan/tilt servo positions

use serde::{Deserialize, Serialize};

use crate::config::AxisLimits;

/// Turret axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Pan,
    Tilt,
}

/// Last commanded pulse width of each servo
///
/// Every write is clamped to the configured limits, so readers never observe
/// an out-of-range value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoAxes {
    pan_us: i32,
    tilt_us: i32,
    limits: AxisLimits,
}

impl ServoAxes {
    /// Both axes start at the neutral position
    pub fn new(limits: AxisLimits) -> Self {
        Self {
            pan_us: limits.neutral_us,
            tilt_us: limits.neutral_us,
            limits,
        }
    }

    pub fn pan(&self) -> i32 {
        self.pan_us
    }

    pub fn tilt(&self) -> i32 {
        self.tilt_us
    }

    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Pan => self.pan_us,
            Axis::Tilt => self.tilt_us,
        }
    }

    pub fn limits(&self) -> &AxisLimits {
        &self.limits
    }

    /// Set an axis, returning the clamped value actually stored
    pub fn set(&mut self, axis: Axis, value_us: i32) -> i32 {
        let clamped = self.limits.clamp(value_us);
        match axis {
            Axis::Pan => self.pan_us = clamped,
            Axis::Tilt => self.tilt_us = clamped,
        }
        clamped
    }

    /// Move an axis by a relative amount, returning the clamped result
    pub fn nudge(&mut self, axis: Axis, delta_us: i32) -> i32 {
        let target = self.get(axis).saturating_add(delta_us);
        self.set(axis, target)
    }

    pub fn set_pan(&mut self, value_us: i32) -> i32 {
        self.set(Axis::Pan, value_us)
    }

    pub fn nudge_pan(&mut self, delta_us: i32) -> i32 {
        self.nudge(Axis::Pan, delta_us)
    }

    pub fn nudge_tilt(&mut self, delta_us: i32) -> i32 {
        self.nudge(Axis::Tilt, delta_us)
    }
}
