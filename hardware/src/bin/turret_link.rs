//! Bench tool for the turret actuator board
//!
//! Talks to the board over its serial link without running the full
//! controller: watch the status tokens it sends, push single commands, center
//! the servos or run the startup handshake.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use hardware::{SerialCommandChannel, DEFAULT_BAUD};
use turret::clock::{Clock, SystemClock};
use turret::config::{LinkConfig, TurretConfig};
use turret::link::{CommandChannel, CommandLink};
use turret::TurretCommand;

#[derive(Parser, Debug)]
#[command(name = "turret_link")]
#[command(about = "Serial bench tool for the turret actuator board")]
#[command(version)]
struct Args {
    /// Serial port path (e.g., /dev/ttyACM0)
    #[arg(long, global = true, default_value = "/dev/ttyACM0")]
    port: String,

    /// Baud rate
    #[arg(long, global = true, default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Optional JSON config for link timing and axis limits
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print operator tokens received from the board
    Listen {
        /// Number of tokens to receive (0 = infinite)
        #[arg(short, long, default_value = "0")]
        count: u64,
    },

    /// Send one command, e.g. MODE=SCAN or PANU=1600
    Send { command: String },

    /// Move both servos to their neutral position
    Center,

    /// Flush stale input and announce FREE mode
    Handshake,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TurretConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TurretConfig::default(),
    };

    let channel = SerialCommandChannel::open(&args.port, args.baud)
        .with_context(|| format!("Failed to open serial port {}", args.port))?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    match args.command {
        Command::Listen { count } => cmd_listen(channel, clock.as_ref(), count),
        Command::Send { command } => {
            let command: TurretCommand = command
                .parse()
                .with_context(|| format!("Invalid command {command:?}"))?;
            let mut link = open_link(channel, clock, &config.link);
            link.try_send(command)
                .with_context(|| format!("Failed to send {command}"))?;
            info!("Sent {command}");
            Ok(())
        }
        Command::Center => {
            let neutral = config.axes.neutral_us;
            let mut link = open_link(channel, clock, &config.link);
            link.try_send(TurretCommand::Pan(neutral))
                .context("Failed to center pan")?;
            link.try_send(TurretCommand::Tilt(neutral))
                .context("Failed to center tilt")?;
            info!("Centered both axes at {neutral} us");
            Ok(())
        }
        Command::Handshake => {
            let mut link = open_link(channel, clock, &config.link);
            link.handshake().context("Handshake failed")?;
            Ok(())
        }
    }
}

fn open_link(channel: SerialCommandChannel, clock: Arc<dyn Clock>, config: &LinkConfig) -> CommandLink {
    CommandLink::new(Box::new(channel), clock, config)
}

fn cmd_listen(mut channel: SerialCommandChannel, clock: &dyn Clock, count: u64) -> Result<()> {
    info!("Listening for operator tokens...");
    let mut received = 0u64;

    loop {
        match channel.poll_line() {
            Ok(Some(line)) => {
                match turret::OperatorEvent::from_token(&line) {
                    Some(event) => info!("Token {line:?} -> {event:?}"),
                    None => warn!("Unknown token {line:?}"),
                }
                received += 1;
                if count > 0 && received >= count {
                    info!("Received {received} tokens");
                    return Ok(());
                }
            }
            Ok(None) => clock.sleep(Duration::from_millis(10)),
            Err(e) => return Err(e).context("Failed to read from serial port"),
        }
    }
}
