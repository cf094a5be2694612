//! Laser-onto-target alignment
//!
//! A per-axis bang-bang controller: each frame with both the target and the
//! laser dot visible moves each axis by at most one fixed step toward
//! alignment. Offsets are in pixels, corrections in servo microseconds.
//!
//! # Sign convention
//! With [`AxisPolarity::Normal`] a positive offset (target to the right of or
//! below the laser) is corrected by decreasing the pulse width. Flip the
//! polarity per axis if the servos are mounted the other way round.

use crate::config::{AlignmentConfig, AxisPolarity};
use crate::detection::Point;
use crate::filters::TrackedTarget;

/// Result of one alignment step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlignmentStep {
    /// Target center minus laser position, when both were seen
    pub offset: Option<(i32, i32)>,
    /// Pan correction to apply (µs)
    pub pan_delta: i32,
    /// Tilt correction to apply (µs)
    pub tilt_delta: i32,
    /// Both offsets within tolerance in this frame
    pub converged: bool,
}

/// Per-axis bang-bang alignment controller
#[derive(Debug, Clone)]
pub struct AlignmentController {
    config: AlignmentConfig,
}

impl AlignmentController {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Compute the correction for one frame
    ///
    /// Without both a target and a laser dot there is no correction and no
    /// convergence.
    pub fn step(&self, target: Option<&TrackedTarget>, laser: Option<Point>) -> AlignmentStep {
        let (Some(target), Some(laser)) = (target, laser) else {
            return AlignmentStep::default();
        };

        let dx = target.x - laser.x;
        let dy = target.y - laser.y;

        AlignmentStep {
            offset: Some((dx, dy)),
            pan_delta: self.axis_correction(dx, self.config.pan_polarity),
            tilt_delta: self.axis_correction(dy, self.config.tilt_polarity),
            converged: dx.abs() <= self.config.tolerance_px && dy.abs() <= self.config.tolerance_px,
        }
    }

    fn axis_correction(&self, offset: i32, polarity: AxisPolarity) -> i32 {
        if offset.abs() <= self.config.tolerance_px {
            return 0;
        }
        offset.signum() * polarity.correction_sign() * self.config.step_us
    }
}
