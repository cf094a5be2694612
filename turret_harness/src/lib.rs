//! Turret harness for testing and simulation
//!
//! Provides a simulated rig (scene, camera, actuator board) and a runner that
//! drives the turret controller against it for tests and demonstrations.

pub mod runner;
pub mod sim;

pub use runner::{run_engagement, run_until, RunnerResults};
pub use sim::{SimConfig, SimWorld, Simulation};
