use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while configuring or starting the turret controller.
#[derive(Error, Debug)]
pub enum TurretError {
    /// Configuration validation failure.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or written.
    #[error("failed to access configuration {}: {source}", path.display())]
    ConfigIo {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file contents are not valid JSON for `TurretConfig`.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The command channel failed during startup.
    #[error("command channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Errors reported by a `CommandChannel` implementation.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Read or write failure on the underlying stream.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-specific failure (serial driver, simulator, ...).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors parsing the line-oriented actuator protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Line is not of the form `KEY=VALUE`.
    #[error("malformed command line: {0:?}")]
    Malformed(String),

    /// `MODE=` with a mode the actuator board does not know.
    #[error("unknown mode: {0:?}")]
    UnknownMode(String),

    /// Known key with a value that does not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Command key.
        key: String,
        /// Offending value.
        value: String,
    },

    /// Key the actuator board does not know.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
}
