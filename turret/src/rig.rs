//! The collaborators the controller drives: camera, detectors, actuator link, UI events

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::LinkConfig;
use crate::detection::{FrameSource, ShapeDetector, SpotDetector};
use crate::events::EventQueue;
use crate::link::{CommandChannel, CommandLink};

/// Everything outside the control logic, bundled for the controller's loop
pub struct Rig {
    pub frames: Box<dyn FrameSource>,
    pub shapes: Box<dyn ShapeDetector>,
    pub spots: Box<dyn SpotDetector>,
    pub link: CommandLink,
    pub events: EventQueue,
    pub clock: Arc<dyn Clock>,
}

impl Rig {
    /// Assemble a rig; the channel is wrapped in a throttled `CommandLink`
    pub fn new(
        frames: Box<dyn FrameSource>,
        shapes: Box<dyn ShapeDetector>,
        spots: Box<dyn SpotDetector>,
        channel: Box<dyn CommandChannel>,
        clock: Arc<dyn Clock>,
        link_config: &LinkConfig,
    ) -> Self {
        let link = CommandLink::new(channel, clock.clone(), link_config);
        Self {
            frames,
            shapes,
            spots,
            link,
            events: EventQueue::new(),
            clock,
        }
    }
}
