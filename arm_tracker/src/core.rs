//! Tracker core and update loop.
//!
//! `TrackerCore` owns the angle tracker, the kinematics engine, the active
//! edge source and the host session. The polling side of the system runs
//! here; the edge side runs inside the source.
//!
//! One cycle:
//! 1. drain pending host input and answer every complete command line
//! 2. `AngleTracker::update()`
//! 3. `ForwardKinematicsEngine::calculate()`
//! 4. write a `POS` line if the session is recording
//! 5. sleep for the rest of `update_interval_ms`

use crate::kinematics::{ForwardKinematicsEngine, LinkageGeometry};
use crate::protocol::{Command, LineBuffer, Response, Session, SystemInfo, ack};
use crate::source_registry::SourceRegistry;
use crate::tracker::AngleTracker;
use arm::arm::config::ArmConfig;
use arm::arm::source::{EdgeSink, EdgeSource, SourceDiagnostics, SourceError};
use arm::config::{ConfigError, ConfigLoader};
use arm::telemetry::TelemetryRecord;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the tracker service.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Edge source failure
    #[error("Edge source error: {0}")]
    Source(#[from] SourceError),

    /// Host output failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation requires `init()` first
    #[error("Initialization failed: {0}")]
    InitFailed(String),
}

/// Timing statistics for loop monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingStats {
    /// Number of cycles executed
    pub cycle_count: u64,
    /// Cycles that exceeded the update interval
    pub timing_violations: u64,
    /// Longest observed cycle
    pub max_cycle_time_us: u64,
    /// Sum of cycle times for the average
    pub total_cycle_time_us: u64,
}

impl TimingStats {
    /// Mean cycle time in microseconds.
    pub fn average_cycle_time_us(&self) -> u64 {
        self.total_cycle_time_us
            .checked_div(self.cycle_count)
            .unwrap_or(0)
    }

    /// Record one cycle. Returns true if it was a timing violation.
    fn record(&mut self, cycle_time_us: u64, target_us: u64) -> bool {
        self.cycle_count += 1;
        self.total_cycle_time_us += cycle_time_us;
        self.max_cycle_time_us = self.max_cycle_time_us.max(cycle_time_us);
        if cycle_time_us > target_us {
            self.timing_violations += 1;
            true
        } else {
            false
        }
    }
}

/// The tracker service.
pub struct TrackerCore {
    config: ArmConfig,
    tracker: AngleTracker,
    engine: ForwardKinematicsEngine,
    source: Option<Box<dyn EdgeSource>>,
    session: Session,
    line_buffer: LineBuffer,
    running: Arc<AtomicBool>,
    cycle_time: Duration,
    stats: TimingStats,
    started: Instant,
}

impl TrackerCore {
    /// Create a tracker from a configuration.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn new(config: ArmConfig) -> Result<Self, TrackerError> {
        config.validate()?;

        let tracker = AngleTracker::new(&config.encoder);
        let engine = ForwardKinematicsEngine::new(LinkageGeometry::from(&config.geometry));
        let cycle_time = Duration::from_millis(u64::from(config.update_interval_ms));

        info!(
            "TrackerCore created: source={}, update_interval={}ms",
            config.source, config.update_interval_ms
        );

        Ok(Self {
            config,
            tracker,
            engine,
            source: None,
            session: Session::Idle,
            line_buffer: LineBuffer::new(),
            running: Arc::new(AtomicBool::new(false)),
            cycle_time,
            stats: TimingStats::default(),
            started: Instant::now(),
        })
    }

    /// Load `arm.toml`.
    pub fn load_config(path: &Path) -> Result<ArmConfig, TrackerError> {
        info!("Loading configuration from {:?}", path);
        let config = ArmConfig::load(path)?;
        debug!(
            "Loaded config: source={}, ppr={}, links={:?}",
            config.source, config.encoder.ppr, config.geometry.links
        );
        Ok(config)
    }

    /// Create, initialize and start the configured edge source.
    ///
    /// # Errors
    /// Returns error if the source is unknown or fails to start.
    pub fn init(&mut self, registry: &SourceRegistry) -> Result<(), TrackerError> {
        if self.source.is_some() {
            return Err(SourceError::AlreadyRunning(self.config.source.clone()).into());
        }
        info!("Initializing TrackerCore with source '{}'...", self.config.source);

        let mut source = registry.create_source(&self.config.source)?;
        info!("Created source: {} v{}", source.name(), source.version());

        source.init(&self.config)?;
        let sink: Arc<dyn EdgeSink> = self.tracker.decoders();
        source.start(sink)?;

        self.source = Some(source);
        self.started = Instant::now();
        info!("TrackerCore initialized successfully");
        Ok(())
    }

    /// Sample the encoders and recompute the position.
    pub fn cycle(&mut self) -> TelemetryRecord {
        self.tracker.update();
        let position = self.engine.calculate(&self.tracker.angles());
        TelemetryRecord {
            millis: self.millis(),
            position,
            angles_deg: self.tracker.angles_degrees(),
        }
    }

    fn millis(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Execute one host command.
    pub fn handle_command(&mut self, command: Command) -> Response {
        match command {
            Command::Start => {
                self.transition(&command);
                Response::Ack(ack::RECORDING_STARTED)
            }
            Command::Stop => {
                self.transition(&command);
                Response::Ack(ack::RECORDING_STOPPED)
            }
            Command::Pause => {
                self.transition(&command);
                Response::Ack(ack::RECORDING_PAUSED)
            }
            Command::Resume => {
                self.transition(&command);
                Response::Ack(ack::RECORDING_RESUMED)
            }
            Command::Zero => {
                self.tracker.zero();
                self.tracker.update();
                let origin = self.engine.capture_origin(&self.tracker.angles());
                self.engine.calculate(&self.tracker.angles());
                info!(
                    "Encoders zeroed, origin ({:.3}, {:.3}, {:.3})",
                    origin.x, origin.y, origin.z
                );
                Response::Ack(ack::ENCODERS_ZEROED)
            }
            Command::GetPos => Response::Position(self.cycle()),
            Command::SetPpr(ppr) => {
                self.tracker.set_resolution(ppr);
                Response::Ack(ack::PPR_SET)
            }
            Command::SetDim([l1, l2, l3, l4]) => {
                self.engine.set_dimensions(l1, l2, l3, l4);
                Response::Ack(ack::DIMENSIONS_SET)
            }
            Command::SetTool(offset) => {
                self.engine.set_tool_offset(offset.x, offset.y, offset.z);
                Response::Ack(ack::TOOL_OFFSET_SET)
            }
            Command::Info => Response::Info(self.system_info()),
            Command::Version => Response::Version,
        }
    }

    fn transition(&mut self, command: &Command) {
        let next = self.session.next(command);
        if next != self.session {
            info!("Session {:?} -> {:?}", self.session, next);
        }
        self.session = next;
    }

    /// Parse and execute one command line.
    pub fn handle_line(&mut self, line: &str) -> Response {
        match line.parse::<Command>() {
            Ok(command) => {
                debug!("Command: {:?}", command);
                self.handle_command(command)
            }
            Err(e) => {
                warn!("Rejected command {:?}: {}", line.trim(), e);
                Response::Error(e)
            }
        }
    }

    /// Feed raw host input, writing one response per complete line.
    pub fn handle_input<W: Write>(&mut self, bytes: &[u8], out: &mut W) -> io::Result<()> {
        for line in self.line_buffer.extend(bytes) {
            let response = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(&line),
                Err(e) => {
                    warn!("Input line discarded: {}", e);
                    Response::Error(e)
                }
            };
            writeln!(out, "{response}")?;
        }
        Ok(())
    }

    /// Run the update loop until the running flag is cleared.
    ///
    /// `input` carries raw host bytes; `out` receives every response and
    /// streamed `POS` line.
    ///
    /// # Errors
    /// Returns error if the core was not initialized or output fails.
    pub fn run<W: Write>(&mut self, input: &Receiver<Vec<u8>>, out: &mut W) -> Result<(), TrackerError> {
        if self.source.is_none() {
            return Err(TrackerError::InitFailed("Edge source not started".to_string()));
        }

        info!(
            "Starting TrackerCore loop (update_interval={}ms)...",
            self.cycle_time.as_millis()
        );
        self.running.store(true, Ordering::SeqCst);

        let target_us = u64::try_from(self.cycle_time.as_micros()).unwrap_or(u64::MAX);
        let mut input_open = true;

        while self.running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();

            while input_open {
                match input.try_recv() {
                    Ok(bytes) => self.handle_input(&bytes, out)?,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("Host input closed");
                        input_open = false;
                    }
                }
            }

            let record = self.cycle();
            if self.session.is_streaming() {
                writeln!(out, "{record}")?;
            }
            out.flush()?;

            let cycle_time_us = u64::try_from(cycle_start.elapsed().as_micros()).unwrap_or(u64::MAX);
            if self.stats.record(cycle_time_us, target_us)
                && (self.stats.timing_violations <= 10 || self.stats.timing_violations % 1000 == 0)
            {
                warn!(
                    "Timing violation #{}: cycle took {}us (target {}us)",
                    self.stats.timing_violations, cycle_time_us, target_us
                );
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Update loop: {} cycles, avg={}us, max={}us, violations={}",
                    self.stats.cycle_count,
                    self.stats.average_cycle_time_us(),
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations
                );
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.cycle_time {
                std::thread::sleep(self.cycle_time - elapsed);
            }
        }

        info!(
            "TrackerCore loop stopped after {} cycles (violations: {})",
            self.stats.cycle_count, self.stats.timing_violations
        );
        Ok(())
    }

    /// Stop the loop and the edge source.
    pub fn shutdown(&mut self) -> Result<(), TrackerError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        if let Some(mut source) = self.source.take() {
            source.shutdown()?;
            if let Some(diag) = source.diagnostics() {
                info!(
                    "Source '{}' delivered {} edges",
                    source.name(),
                    diag.edges_emitted
                );
            }
        }

        let missed = self.tracker.missed_transitions();
        if missed.iter().any(|&count| count > 0) {
            warn!("Polled decoding missed transitions per axis: {:?}", missed);
        }
        Ok(())
    }

    /// Running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Current settings as reported by `INFO`.
    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            ppr: self.tracker.resolution(),
            update_interval_ms: self.config.update_interval_ms,
            links: self.engine.geometry().links,
        }
    }

    /// Host session state.
    pub fn session(&self) -> Session {
        self.session
    }

    /// Angle tracker.
    pub fn tracker(&self) -> &AngleTracker {
        &self.tracker
    }

    /// Kinematics engine.
    pub fn engine(&self) -> &ForwardKinematicsEngine {
        &self.engine
    }

    /// Diagnostics of the active source.
    pub fn source_diagnostics(&self) -> Option<SourceDiagnostics> {
        self.source.as_ref().and_then(|s| s.diagnostics())
    }

    /// Loop timing statistics.
    pub fn stats(&self) -> TimingStats {
        self.stats
    }
}
