//! # Arm Tracker Binary
//!
//! Streams the tip position of the digitizing arm and answers host commands.
//! Commands are read from stdin, `POS`/`ACK`/`ERROR`/`INFO` lines go to
//! stdout, logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Simulated encoders, default geometry
//! arm_tracker --config config/arm.toml
//!
//! # Override the edge source
//! arm_tracker --config config/arm.toml --source simulation
//!
//! # Verbose JSON logging
//! arm_tracker -v --json
//! ```

use arm::arm::config::ArmConfig;
use arm::config::LogLevel;
use arm::consts::{DEFAULT_CONFIG_PATH, TRACKER_SERVICE_NAME};
use arm_tracker::{SourceRegistry, TrackerCore, TrackerError};
use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Arm Tracker - encoder decoding and forward kinematics for a 4-axis arm
#[derive(Parser, Debug)]
#[command(name = "arm_tracker")]
#[command(version)]
#[command(about = "Pose tracker for a 4-axis digitizing arm")]
#[command(long_about = None)]
struct Args {
    /// Path to arm configuration file (arm.toml).
    /// Defaults are used if the file does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Edge source to load, overrides `source` in arm.toml
    #[arg(short, long)]
    source: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("{} failed: {}", TRACKER_SERVICE_NAME, e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = load_config(&args);
    let log_level = loaded
        .as_ref()
        .map(|config| config.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    let mut config = loaded?;
    info!(
        "Arm Tracker v{} starting (service={})...",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );
    if let Some(source) = args.source {
        info!("Edge source from CLI: {}", source);
        config.source = source;
    }

    let mut core = TrackerCore::new(config)?;

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let registry = SourceRegistry::with_builtin();
    debug!("Registered edge sources: {:?}", registry.list_sources());
    core.init(&registry)?;

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = core.run(&rx, &mut out) {
        error!("Update loop error: {}", e);
    }

    core.shutdown()?;

    info!("Arm Tracker shutdown complete");
    Ok(())
}

/// Forward raw stdin bytes to the update loop.
fn spawn_stdin_reader(tx: Sender<Vec<u8>>) -> io::Result<()> {
    thread::Builder::new()
        .name("arm-stdin".to_string())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
        })
        .map(|_| ())
}

/// Load arm.toml, or defaults when the file does not exist.
///
/// Runs before the subscriber is installed, so it does not log.
fn load_config(args: &Args) -> Result<ArmConfig, TrackerError> {
    if args.config.exists() {
        TrackerCore::load_config(&args.config)
    } else {
        Ok(ArmConfig::default())
    }
}

/// Setup tracing subscriber based on CLI arguments and `[shared]`.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        log_level.as_directive().parse().unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}
