//! Line-oriented serial link to the actuator board
//!
//! Outbound commands are written as `\n` terminated ASCII lines. Inbound
//! status tokens (`S`, `Q`, `F`, `M`) arrive the same way, possibly split
//! across reads, so bytes go through a [`LineFramer`] before they reach the
//! controller.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;

use log::{debug, warn};
use serialport::{ClearBuffer, SerialPort};
use thiserror::Error;

use turret::error::ChannelError;
use turret::link::CommandChannel;

/// Baud rate the actuator firmware listens on
pub const DEFAULT_BAUD: u32 = 9600;

/// Longest line we are willing to buffer before assuming garbage
const MAX_LINE_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LinkError> for ChannelError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Io(e) => ChannelError::Io(e),
            LinkError::Serial(e) => ChannelError::Transport(e.to_string()),
        }
    }
}

/// Splits an inbound byte stream into lines
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Add incoming bytes and return every line they complete
    ///
    /// Line terminators and carriage returns are stripped. Empty lines are
    /// dropped.
    pub fn push_bytes(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in data {
            match byte {
                b'\n' => {
                    let raw = std::mem::take(&mut self.buffer);
                    let line = String::from_utf8_lossy(&raw).trim().to_string();
                    if !line.is_empty() {
                        lines.push(line);
                    }
                }
                b'\r' => {}
                _ => self.buffer.push(byte),
            }
        }

        // Prevent buffer from growing unbounded if the board sends garbage
        if self.buffer.len() > MAX_LINE_LEN {
            warn!(
                "Line buffer overflow ({} bytes without a newline), discarding",
                self.buffer.len()
            );
            self.buffer.clear();
        }

        lines
    }

    /// Bytes received since the last complete line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// [`CommandChannel`] over a serial port
pub struct SerialCommandChannel {
    port: Box<dyn SerialPort>,
    framer: LineFramer,
    lines: VecDeque<String>,
    read_buffer: Vec<u8>,
}

impl SerialCommandChannel {
    /// Open a serial port for the actuator board
    pub fn open(path: &str, baud: u32) -> Result<Self, LinkError> {
        log::info!("Opening serial port: {path} at {baud} bps");
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(100))
            .open()?;
        Ok(Self::from_port(port))
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            framer: LineFramer::new(),
            lines: VecDeque::new(),
            read_buffer: vec![0u8; 256],
        }
    }

    fn read_available(&mut self) -> Result<(), LinkError> {
        let available = self.port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(());
        }

        let want = available.min(self.read_buffer.len());
        let bytes_read = self.port.read(&mut self.read_buffer[..want])?;
        debug!("Read {bytes_read} bytes");
        let lines = self.framer.push_bytes(&self.read_buffer[..bytes_read]);
        self.lines.extend(lines);
        Ok(())
    }
}

impl CommandChannel for SerialCommandChannel {
    fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }

    fn poll_line(&mut self) -> Result<Option<String>, ChannelError> {
        if self.lines.is_empty() {
            self.read_available()?;
        }
        Ok(self.lines.pop_front())
    }

    fn clear_input(&mut self) -> Result<(), ChannelError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(LinkError::from)?;
        self.framer.clear();
        self.lines.clear();
        Ok(())
    }
}
