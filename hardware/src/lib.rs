//! Hardware side of the turret: the serial link to the actuator board

pub mod serial_link;

pub use serial_link::{LineFramer, LinkError, SerialCommandChannel, DEFAULT_BAUD};
