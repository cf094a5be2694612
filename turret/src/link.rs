//! Outbound path to the actuator board
//!
//! [`CommandChannel`] is the raw duplex transport (serial port, simulator, test
//! recorder). [`CommandLink`] wraps it with the send throttle, the startup
//! handshake and inbound token decoding. The controller only ever talks to the
//! hardware through a `CommandLink`.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::LinkConfig;
use crate::error::ChannelError;
use crate::events::OperatorEvent;
use crate::protocol::{ModeCommand, TurretCommand};

/// Duplex line-oriented transport to the actuator board
pub trait CommandChannel: Send {
    /// Write one command line; the implementation appends the terminator
    fn send_line(&mut self, line: &str) -> Result<(), ChannelError>;

    /// Return one complete inbound line if available, without blocking
    fn poll_line(&mut self) -> Result<Option<String>, ChannelError>;

    /// Discard any inbound data that has not been read yet
    fn clear_input(&mut self) -> Result<(), ChannelError> {
        while self.poll_line()?.is_some() {}
        Ok(())
    }
}

/// Throttled command sender and inbound event decoder
pub struct CommandLink {
    channel: Box<dyn CommandChannel>,
    clock: Arc<dyn Clock>,
    min_send_interval: Duration,
    handshake_settle: Duration,
    last_sent: Option<Duration>,
    commands_sent: usize,
}

impl CommandLink {
    pub fn new(channel: Box<dyn CommandChannel>, clock: Arc<dyn Clock>, config: &LinkConfig) -> Self {
        Self {
            channel,
            clock,
            min_send_interval: config.min_send_interval(),
            handshake_settle: config.handshake_settle(),
            last_sent: None,
            commands_sent: 0,
        }
    }

    /// Number of commands successfully written so far
    pub fn commands_sent(&self) -> usize {
        self.commands_sent
    }

    /// Send a command, waiting out the minimum interval since the previous one
    pub fn try_send(&mut self, command: TurretCommand) -> Result<(), ChannelError> {
        if let Some(last) = self.last_sent {
            let since = self.clock.now().saturating_sub(last);
            if since < self.min_send_interval {
                self.clock.sleep(self.min_send_interval - since);
            }
        }

        let line = command.to_string();
        self.channel.send_line(&line)?;
        self.last_sent = Some(self.clock.now());
        self.commands_sent += 1;
        log::debug!("Sent {line}");
        Ok(())
    }

    /// Send a command, logging instead of failing on transport errors
    ///
    /// Returns whether the command was written.
    pub fn send(&mut self, command: TurretCommand) -> bool {
        match self.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to send {command}: {e}");
                false
            }
        }
    }

    /// Poll the channel for one operator event
    ///
    /// Empty input, unknown tokens and transport errors all yield `None`.
    pub fn poll_event(&mut self) -> Option<OperatorEvent> {
        let line = match self.channel.poll_line() {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read from command channel: {e}");
                return None;
            }
        };

        let token = line.trim();
        if token.is_empty() {
            return None;
        }
        log::debug!("Received token {token:?}");

        let event = OperatorEvent::from_token(token);
        if event.is_none() {
            log::warn!("Ignoring unknown token from actuator board: {token:?}");
        }
        event
    }

    /// Flush stale inbound data and announce FREE mode
    pub fn handshake(&mut self) -> Result<(), ChannelError> {
        self.clock.sleep(self.handshake_settle);
        self.channel.clear_input()?;
        self.clock.sleep(self.handshake_settle);
        self.try_send(TurretCommand::Mode(ModeCommand::Free))?;
        log::info!("Actuator link ready, announced FREE mode");
        Ok(())
    }
}
