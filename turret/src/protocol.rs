//! Line protocol spoken with the actuator board
//!
//! Outbound commands are `KEY=VALUE` text lines terminated by `\n`. Inbound
//! traffic is limited to single-character status tokens, see
//! [`OperatorEvent::from_token`](crate::events::OperatorEvent::from_token).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Operating modes announced to the actuator board with `MODE=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeCommand {
    Free,
    Scan,
    Lock,
    Manual,
    Off,
    FireWarn,
}

impl ModeCommand {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeCommand::Free => "FREE",
            ModeCommand::Scan => "SCAN",
            ModeCommand::Lock => "LOCK",
            ModeCommand::Manual => "MANUAL",
            ModeCommand::Off => "OFF",
            ModeCommand::FireWarn => "FIRE_WARN",
        }
    }
}

impl fmt::Display for ModeCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(ModeCommand::Free),
            "SCAN" => Ok(ModeCommand::Scan),
            "LOCK" => Ok(ModeCommand::Lock),
            "MANUAL" => Ok(ModeCommand::Manual),
            "OFF" => Ok(ModeCommand::Off),
            "FIRE_WARN" => Ok(ModeCommand::FireWarn),
            other => Err(ProtocolError::UnknownMode(other.to_string())),
        }
    }
}

/// A single outbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurretCommand {
    /// `MODE=<mode>`
    Mode(ModeCommand),
    /// `FIRE=1`
    Fire,
    /// `PANU=<µs>`
    Pan(i32),
    /// `TILTU=<µs>`
    Tilt(i32),
}

impl fmt::Display for TurretCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TurretCommand::Mode(mode) => write!(f, "MODE={mode}"),
            TurretCommand::Fire => f.write_str("FIRE=1"),
            TurretCommand::Pan(us) => write!(f, "PANU={us}"),
            TurretCommand::Tilt(us) => write!(f, "TILTU={us}"),
        }
    }
}

impl FromStr for TurretCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;

        let parse_us = |value: &str| {
            value
                .parse::<i32>()
                .map_err(|_| ProtocolError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })
        };

        match key {
            "MODE" => Ok(TurretCommand::Mode(value.parse()?)),
            "FIRE" if value == "1" => Ok(TurretCommand::Fire),
            "FIRE" => Err(ProtocolError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
            "PANU" => Ok(TurretCommand::Pan(parse_us(value)?)),
            "TILTU" => Ok(TurretCommand::Tilt(parse_us(value)?)),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}
