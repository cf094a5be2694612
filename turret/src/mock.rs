//! Scripted collaborators for tests and dry runs
//!
//! Every mock is cheap to clone and shares its state through `Arc<Mutex<..>>`,
//! so a test can hand one clone to the controller and keep another to inspect
//! or steer it.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::Clock;
use crate::detection::{Detection, Frame, FrameSource, Point, ShapeDetector, SpotDetector};
use crate::error::ChannelError;
use crate::events::{EventSource, OperatorEvent};
use crate::link::CommandChannel;
use crate::protocol::TurretCommand;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clock that only moves when told to, or when something sleeps on it
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        *lock(&self.now) += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *lock(&self.now)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[derive(Debug, Default)]
struct ChannelState {
    sent: Vec<String>,
    /// (poll number from which the line is deliverable, line)
    inbound: VecDeque<(u64, String)>,
    polls: u64,
    failing: bool,
}

/// Command channel that records outbound lines and replays scripted inbound tokens
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an inbound line deliverable on the next poll
    pub fn push_inbound(&self, line: &str) {
        self.schedule_inbound(0, line);
    }

    /// Queue an inbound line that becomes deliverable on the given poll (1-based)
    ///
    /// Lines are delivered in the order they were queued.
    pub fn schedule_inbound(&self, at_poll: u64, line: &str) {
        lock(&self.state)
            .inbound
            .push_back((at_poll, line.to_string()));
    }

    /// Make every subsequent send fail
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    /// All lines written so far
    pub fn sent_lines(&self) -> Vec<String> {
        lock(&self.state).sent.clone()
    }

    /// All lines written so far, parsed back into commands
    pub fn sent_commands(&self) -> Vec<TurretCommand> {
        lock(&self.state)
            .sent
            .iter()
            .filter_map(|line| line.parse().ok())
            .collect()
    }

    /// Number of times a given command has been written
    pub fn count(&self, command: TurretCommand) -> usize {
        self.sent_commands()
            .into_iter()
            .filter(|sent| *sent == command)
            .count()
    }

    /// Number of inbound polls so far
    pub fn polls(&self) -> u64 {
        lock(&self.state).polls
    }
}

impl CommandChannel for RecordingChannel {
    fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(ChannelError::Transport("scripted failure".to_string()));
        }
        state.sent.push(line.to_string());
        Ok(())
    }

    fn poll_line(&mut self) -> Result<Option<String>, ChannelError> {
        let mut state = lock(&self.state);
        state.polls += 1;
        let polls = state.polls;
        let ready = matches!(state.inbound.front(), Some((due, _)) if *due <= polls);
        if ready {
            Ok(state.inbound.pop_front().map(|(_, line)| line))
        } else {
            Ok(None)
        }
    }

    fn clear_input(&mut self) -> Result<(), ChannelError> {
        lock(&self.state).inbound.clear();
        Ok(())
    }
}

/// Endless source of black frames, with optional unreadable frame numbers
#[derive(Debug, Clone)]
pub struct BlankFrames {
    width: usize,
    height: usize,
    next: Arc<Mutex<u64>>,
    unreadable: HashSet<u64>,
}

impl BlankFrames {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            next: Arc::new(Mutex::new(0)),
            unreadable: HashSet::new(),
        }
    }

    /// Frame numbers for which `next_frame` returns `None`
    pub fn with_unreadable(mut self, frame_numbers: impl IntoIterator<Item = u64>) -> Self {
        self.unreadable.extend(frame_numbers);
        self
    }
}

impl FrameSource for BlankFrames {
    fn next_frame(&mut self) -> Option<Frame> {
        let mut next = lock(&self.next);
        let frame_number = *next;
        *next += 1;
        if self.unreadable.contains(&frame_number) {
            return None;
        }
        Some(Frame::blank(self.width, self.height, frame_number))
    }
}

#[derive(Debug)]
struct Script<T> {
    queue: VecDeque<Option<T>>,
    fallback: Option<T>,
    calls: usize,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: None,
            calls: 0,
        }
    }
}

impl<T: Copy> Script<T> {
    fn next(&mut self) -> Option<T> {
        self.calls += 1;
        match self.queue.pop_front() {
            Some(item) => item,
            None => self.fallback,
        }
    }
}

/// Shape detector replaying a fixed sequence of results
///
/// Once the sequence is exhausted it keeps returning the fallback.
#[derive(Debug, Clone, Default)]
pub struct ScriptedShapes {
    script: Arc<Mutex<Script<Detection>>>,
}

impl ScriptedShapes {
    pub fn new(results: impl IntoIterator<Item = Option<Detection>>) -> Self {
        let shapes = Self::default();
        shapes.extend(results);
        shapes
    }

    /// Always returns the same detection
    pub fn constant(detection: Detection) -> Self {
        Self::default().then_repeat(Some(detection))
    }

    pub fn then_repeat(self, fallback: Option<Detection>) -> Self {
        lock(&self.script).fallback = fallback;
        self
    }

    /// Append more scripted results
    pub fn extend(&self, results: impl IntoIterator<Item = Option<Detection>>) {
        lock(&self.script).queue.extend(results);
    }

    /// Replace the fallback returned after the script runs out
    pub fn set_fallback(&self, fallback: Option<Detection>) {
        lock(&self.script).fallback = fallback;
    }

    /// Number of frames the detector has been run on
    pub fn calls(&self) -> usize {
        lock(&self.script).calls
    }
}

impl ShapeDetector for ScriptedShapes {
    fn detect(&mut self, _frame: &Frame) -> Option<Detection> {
        lock(&self.script).next()
    }
}

/// Laser spot detector replaying a fixed sequence of results
#[derive(Debug, Clone, Default)]
pub struct ScriptedSpots {
    script: Arc<Mutex<Script<Point>>>,
}

impl ScriptedSpots {
    pub fn new(results: impl IntoIterator<Item = Option<Point>>) -> Self {
        let spots = Self::default();
        lock(&spots.script).queue.extend(results);
        spots
    }

    pub fn constant(point: Point) -> Self {
        let spots = Self::default();
        spots.set_fallback(Some(point));
        spots
    }

    pub fn set_fallback(&self, fallback: Option<Point>) {
        lock(&self.script).fallback = fallback;
    }

    pub fn calls(&self) -> usize {
        lock(&self.script).calls
    }
}

impl SpotDetector for ScriptedSpots {
    fn detect(&mut self, _frame: &Frame) -> Option<Point> {
        lock(&self.script).next()
    }
}

/// UI event source replaying key presses at given poll numbers (1-based)
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<(u64, char)>,
    polls: u64,
}

impl ScriptedKeys {
    pub fn new(keys: Vec<(u64, char)>) -> Self {
        Self {
            keys: keys.into(),
            polls: 0,
        }
    }
}

impl EventSource for ScriptedKeys {
    fn poll_event(&mut self) -> Option<OperatorEvent> {
        self.polls += 1;
        let ready = matches!(self.keys.front(), Some((due, _)) if *due <= self.polls);
        if !ready {
            return None;
        }
        self.keys
            .pop_front()
            .and_then(|(_, key)| OperatorEvent::from_key(key))
    }
}
