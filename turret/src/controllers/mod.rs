//! Closed-loop controllers for the turret
//!
//! Currently only the laser-onto-target alignment loop.

mod alignment;

pub use alignment::{AlignmentController, AlignmentStep};
