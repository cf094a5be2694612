use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use turret::clock::Clock;
use turret::detection::{Detection, Point};
use turret::{Turret, TurretCallbackEvent, TurretConfig};
use turret_harness::{run_engagement, SimConfig, Simulation};

/// Command line arguments for the engagement demo
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Simulated scan, alignment and fire sequence"
)]
struct Args {
    /// Target center x in pixels (omit the target with --no-target)
    #[arg(long, default_value_t = 220)]
    target_x: i32,

    /// Target center y in pixels
    #[arg(long, default_value_t = 140)]
    target_y: i32,

    /// Target radius in pixels
    #[arg(long, default_value_t = 40)]
    target_radius: i32,

    /// Run with an empty scene
    #[arg(long)]
    no_target: bool,

    /// Frame on which the target enters the scene
    #[arg(long, default_value_t = 0)]
    appears_at: u64,

    /// Probability that the ring detector misses the target
    #[arg(long, default_value_t = 0.0)]
    dropout: f64,

    /// Detection jitter in pixels
    #[arg(long, default_value_t = 0)]
    jitter: i32,

    /// Laser pixels per microsecond of servo travel
    #[arg(long, default_value_t = 0.5)]
    gain: f64,

    /// Frame rate in Hz
    #[arg(long, default_value_t = 30.0)]
    frame_rate: f64,

    /// Frame on which the board sends the scan request
    #[arg(long, default_value_t = 1)]
    scan_at: u64,

    /// Frame on which the board sends quit
    #[arg(long, default_value_t = 1500)]
    quit_at: u64,

    /// Maximum control loop iterations
    #[arg(long, default_value_t = 10_000)]
    max_ticks: usize,

    /// Random seed for detector noise
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Optional JSON controller config
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TurretConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TurretConfig::default(),
    };

    ensure!(args.frame_rate > 0.0, "Frame rate must be positive");
    ensure!(
        (0.0..=1.0).contains(&args.dropout),
        "Dropout must be a probability"
    );

    let sim_config = SimConfig {
        laser_origin: Point::new(160, 120),
        px_per_us: args.gain,
        target: (!args.no_target)
            .then(|| Detection::new(args.target_x, args.target_y, args.target_radius)),
        target_appears_at: args.appears_at,
        dropout_probability: args.dropout,
        jitter_px: args.jitter,
        frame_interval: Duration::from_secs_f64(1.0 / args.frame_rate),
        seed: args.seed,
        ..SimConfig::default()
    };

    println!("Turret Engagement Demo");
    println!("======================");
    match sim_config.target {
        Some(target) => println!(
            "Target: ({}, {}) radius {} from frame {}",
            target.x, target.y, target.radius, args.appears_at
        ),
        None => println!("Target: none"),
    }
    println!("Scan request at frame {}, quit at frame {}", args.scan_at, args.quit_at);

    let mut sim = Simulation::new(sim_config, &config.axes, &config.link);
    sim.world.schedule_token(args.scan_at, "S");
    sim.world.schedule_token(args.quit_at, "Q");

    let mut turret = Turret::new(config).context("Invalid controller config")?;
    turret.register_callback(|event| match event {
        TurretCallbackEvent::ModeChanged { from, to } => {
            println!("  {} -> {}", from.name(), to.name())
        }
        TurretCallbackEvent::ScanFinished {
            found,
            interrupted,
            pan_us,
        } => println!("  scan finished: found={found} interrupted={interrupted} pan={pan_us}"),
        TurretCallbackEvent::Fired { pan_us, tilt_us } => {
            println!("  FIRE at pan={pan_us} tilt={tilt_us}")
        }
        _ => {}
    });

    let results = run_engagement(&mut turret, &mut sim.rig, args.max_ticks)
        .context("Engagement run failed")?;

    let laser = sim.world.laser_position();
    println!();
    println!("Ticks: {}", results.ticks);
    println!("Frames rendered: {}", sim.world.frames_rendered());
    println!("Ticks aligning: {}", results.ticks_aligning);
    println!("Shots fired: {}", results.shots_fired);
    println!("Final laser position: ({}, {})", laser.x, laser.y);
    println!("Final mode: {}", results.final_mode.name());
    println!("Simulated time: {:.1}s", sim.clock.now().as_secs_f64());

    Ok(())
}
