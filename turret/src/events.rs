//! Operator requests from the actuator board and the UI
//!
//! Both origins feed one ordered [`EventQueue`] so the state machine never has
//! to know where a request came from.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::link::CommandLink;

/// A request from the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorEvent {
    /// Start an exploration scan
    ScanRequest,
    /// Shut the controller down
    Quit,
    /// Abort whatever is running and return to FREE
    ForceFree,
    /// Hand the turret to manual control
    Manual,
}

impl OperatorEvent {
    /// Decode a status token sent by the actuator board
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "S" => Some(OperatorEvent::ScanRequest),
            "Q" => Some(OperatorEvent::Quit),
            "F" => Some(OperatorEvent::ForceFree),
            "M" => Some(OperatorEvent::Manual),
            _ => None,
        }
    }

    /// Decode a UI key press
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            's' => Some(OperatorEvent::ScanRequest),
            'q' => Some(OperatorEvent::Quit),
            'f' => Some(OperatorEvent::ForceFree),
            'm' => Some(OperatorEvent::Manual),
            _ => None,
        }
    }

    /// Whether this request aborts a running scan
    pub fn is_interrupt(&self) -> bool {
        matches!(self, OperatorEvent::Quit | OperatorEvent::ForceFree)
    }
}

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOrigin {
    Hardware,
    Ui,
}

/// Event waiting in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedEvent {
    pub event: OperatorEvent,
    pub origin: EventOrigin,
}

/// Non-hardware producer of operator events (keyboard, UI buttons)
pub trait EventSource: Send {
    /// Return one pending event without blocking
    fn poll_event(&mut self) -> Option<OperatorEvent>;
}

/// Single ordered queue of operator events
#[derive(Default)]
pub struct EventQueue {
    pending: VecDeque<QueuedEvent>,
    ui_sources: Vec<Box<dyn EventSource>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a UI event source
    pub fn add_source(&mut self, source: Box<dyn EventSource>) {
        self.ui_sources.push(source);
    }

    /// Append an event directly
    pub fn push(&mut self, event: OperatorEvent, origin: EventOrigin) {
        self.pending.push_back(QueuedEvent { event, origin });
    }

    /// Poll the hardware link and every UI source once each
    pub fn pump(&mut self, link: &mut CommandLink) {
        if let Some(event) = link.poll_event() {
            self.push(event, EventOrigin::Hardware);
        }
        for source in &mut self.ui_sources {
            if let Some(event) = source.poll_event() {
                self.pending.push_back(QueuedEvent {
                    event,
                    origin: EventOrigin::Ui,
                });
            }
        }
    }

    /// Take the oldest pending event
    pub fn pop(&mut self) -> Option<QueuedEvent> {
        self.pending.pop_front()
    }

    /// Take the first pending interrupt, discarding requests queued ahead of it
    ///
    /// With no interrupt pending every queued request is discarded. Events
    /// after the interrupt stay queued for the main loop.
    pub fn take_interrupt(&mut self) -> Option<QueuedEvent> {
        let end = self
            .pending
            .iter()
            .position(|queued| queued.event.is_interrupt())
            .unwrap_or(self.pending.len());
        for dropped in self.pending.drain(..end) {
            log::debug!(
                "Dropping {:?} from {:?} while scanning",
                dropped.event,
                dropped.origin
            );
        }
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::mock::{ManualClock, RecordingChannel, ScriptedKeys};
    use std::sync::Arc;

    #[test]
    fn test_token_and_key_agree() {
        for (token, key) in [("S", 's'), ("Q", 'q'), ("F", 'f'), ("M", 'm')] {
            assert!(OperatorEvent::from_token(token).is_some());
            assert_eq!(
                OperatorEvent::from_token(token),
                OperatorEvent::from_key(key)
            );
        }
        assert_eq!(OperatorEvent::from_key('Q'), Some(OperatorEvent::Quit));
        assert_eq!(OperatorEvent::from_token("X"), None);
        assert_eq!(OperatorEvent::from_key('x'), None);
    }

    #[test]
    fn test_interrupts() {
        assert!(OperatorEvent::Quit.is_interrupt());
        assert!(OperatorEvent::ForceFree.is_interrupt());
        assert!(!OperatorEvent::ScanRequest.is_interrupt());
        assert!(!OperatorEvent::Manual.is_interrupt());
    }

    #[test]
    fn test_pump_merges_sources_in_order() {
        let channel = RecordingChannel::new();
        channel.push_inbound("M");
        let clock = ManualClock::new();
        let mut link = CommandLink::new(
            Box::new(channel.clone()),
            Arc::new(clock),
            &LinkConfig::default(),
        );

        let mut queue = EventQueue::new();
        queue.add_source(Box::new(ScriptedKeys::new(vec![(1, 's')])));
        queue.pump(&mut link);

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.pop(),
            Some(QueuedEvent {
                event: OperatorEvent::Manual,
                origin: EventOrigin::Hardware
            })
        );
        assert_eq!(
            queue.pop(),
            Some(QueuedEvent {
                event: OperatorEvent::ScanRequest,
                origin: EventOrigin::Ui
            })
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_interrupt_keeps_later_events() {
        let mut queue = EventQueue::new();
        queue.push(OperatorEvent::ScanRequest, EventOrigin::Ui);
        queue.push(OperatorEvent::ForceFree, EventOrigin::Hardware);
        queue.push(OperatorEvent::Quit, EventOrigin::Hardware);

        let interrupt = queue.take_interrupt().unwrap();
        assert_eq!(interrupt.event, OperatorEvent::ForceFree);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().event, OperatorEvent::Quit);
    }

    #[test]
    fn test_take_interrupt_without_interrupt_drops_requests() {
        let mut queue = EventQueue::new();
        queue.push(OperatorEvent::Manual, EventOrigin::Hardware);
        queue.push(OperatorEvent::ScanRequest, EventOrigin::Ui);
        assert!(queue.take_interrupt().is_none());
        assert!(queue.is_empty());
    }
}
