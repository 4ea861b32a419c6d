//! Simulation edge source.
//!
//! Spawns one edge thread that drives all four axes along phase-shifted
//! sine trajectories and delivers the resulting quadrature transitions to
//! the sink. Configured from `[source_config.simulation]`:
//!
//! ```toml
//! [source_config.simulation]
//! amplitude_counts = 400
//! frequency_hz = 0.25
//! tick_us = 200
//! max_steps_per_tick = 64
//! mode = "edge"            # or "polled"
//! ```
//!
//! In `edge` mode every transition is delivered through
//! [`EdgeSink::on_edge`]. In `polled` mode each axis delivers one level
//! sample per tick through [`EdgeSink::on_sample`]; moving more than one
//! phase per tick then shows up as missed transitions.

mod motion;

pub use motion::AxisMotion;

use arm::arm::config::ArmConfig;
use arm::arm::source::{EdgeSink, EdgeSource, SourceDiagnostics, SourceError};
use arm::consts::NUM_AXES;
use serde::Deserialize;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Registry name.
pub const SOURCE_NAME: &str = "simulation";

/// How transitions reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// One `on_edge` call per transition
    #[default]
    Edge,
    /// One `on_sample` call per axis per tick
    Polled,
}

/// `[source_config.simulation]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Peak excursion of every axis in counts
    pub amplitude_counts: u32,
    /// Oscillation frequency
    pub frequency_hz: f64,
    /// Edge thread tick period in microseconds
    pub tick_us: u64,
    /// Edges per axis per tick at most
    pub max_steps_per_tick: u32,
    /// Delivery mode
    pub mode: SimulationMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            amplitude_counts: 400,
            frequency_hz: 0.25,
            tick_us: 200,
            max_steps_per_tick: 64,
            mode: SimulationMode::Edge,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<(), SourceError> {
        if self.tick_us == 0 {
            return Err(SourceError::ConfigError(
                "simulation.tick_us must be greater than 0".to_string(),
            ));
        }
        if !self.frequency_hz.is_finite() || self.frequency_hz < 0.0 {
            return Err(SourceError::ConfigError(format!(
                "simulation.frequency_hz must be finite and >= 0, got {}",
                self.frequency_hz
            )));
        }
        Ok(())
    }
}

/// Factory function for the registry.
pub fn create_source() -> Box<dyn EdgeSource> {
    Box::new(SimulationSource::new())
}

/// Synthetic quadrature edge source.
pub struct SimulationSource {
    config: SimulationConfig,
    initialized: bool,
    running: Arc<AtomicBool>,
    edges_emitted: Arc<AtomicU64>,
    positions: Arc<[AtomicI64; NUM_AXES]>,
    handle: Option<JoinHandle<()>>,
}

impl SimulationSource {
    /// Create an idle source with default settings.
    pub fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
            initialized: false,
            running: Arc::new(AtomicBool::new(false)),
            edges_emitted: Arc::new(AtomicU64::new(0)),
            positions: Arc::new(std::array::from_fn(|_| AtomicI64::new(0))),
            handle: None,
        }
    }

    /// Create a source with explicit settings, skipping `init`.
    pub fn with_config(config: SimulationConfig) -> Result<Self, SourceError> {
        config.validate()?;
        let mut source = Self::new();
        source.config = config;
        source.initialized = true;
        Ok(source)
    }

    /// Active settings.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Net count emitted per axis so far.
    pub fn positions(&self) -> [i64; NUM_AXES] {
        std::array::from_fn(|idx| self.positions[idx].load(Ordering::Acquire))
    }

    /// Whether the edge thread is running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Default for SimulationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge thread body.
fn run_edges(
    config: SimulationConfig,
    sink: Arc<dyn EdgeSink>,
    running: Arc<AtomicBool>,
    edges_emitted: Arc<AtomicU64>,
    positions: Arc<[AtomicI64; NUM_AXES]>,
) {
    let mut axes: [AxisMotion; NUM_AXES] = std::array::from_fn(|idx| {
        AxisMotion::new(idx + 1, config.amplitude_counts, idx as f64 * FRAC_PI_2)
    });
    let tick = Duration::from_micros(config.tick_us);
    let start = Instant::now();

    while running.load(Ordering::Acquire) {
        let t = start.elapsed().as_secs_f64();
        for (idx, motion) in axes.iter_mut().enumerate() {
            let target = motion.target(t, config.frequency_hz);
            let emitted = match config.mode {
                SimulationMode::Edge => {
                    motion.step_toward(target, config.max_steps_per_tick, sink.as_ref())
                }
                SimulationMode::Polled => {
                    motion.sample_toward(target, config.max_steps_per_tick, sink.as_ref())
                }
            };
            if emitted > 0 {
                edges_emitted.fetch_add(u64::from(emitted), Ordering::Relaxed);
                positions[idx].store(motion.position(), Ordering::Release);
            }
        }
        thread::sleep(tick);
    }
}

impl EdgeSource for SimulationSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, config: &ArmConfig) -> Result<(), SourceError> {
        if self.handle.is_some() {
            return Err(SourceError::InitFailed(
                "cannot re-initialize a running simulation".to_string(),
            ));
        }
        let sim: SimulationConfig = config
            .source_table(SOURCE_NAME)
            .map_err(|e| SourceError::ConfigError(e.to_string()))?;
        sim.validate()?;

        info!(
            "Simulation source: mode={:?}, amplitude={} counts, frequency={} Hz, tick={}us",
            sim.mode, sim.amplitude_counts, sim.frequency_hz, sim.tick_us
        );
        if sim.mode == SimulationMode::Polled && sim.max_steps_per_tick > 1 {
            warn!(
                "Polled simulation moves up to {} phases per sample; transitions may be missed",
                sim.max_steps_per_tick
            );
        }
        self.config = sim;
        self.initialized = true;
        Ok(())
    }

    fn start(&mut self, sink: Arc<dyn EdgeSink>) -> Result<(), SourceError> {
        if !self.initialized {
            return Err(SourceError::StartFailed("source not initialized".to_string()));
        }
        if self.handle.is_some() {
            return Err(SourceError::AlreadyRunning(SOURCE_NAME.to_string()));
        }

        self.running.store(true, Ordering::Release);
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let edges_emitted = Arc::clone(&self.edges_emitted);
        let positions = Arc::clone(&self.positions);

        let handle = thread::Builder::new()
            .name("arm-sim-edges".to_string())
            .spawn(move || run_edges(config, sink, running, edges_emitted, positions))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                SourceError::StartFailed(e.to_string())
            })?;

        self.handle = Some(handle);
        debug!("Simulation edge thread started");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SourceError> {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Simulation edge thread panicked");
            }
            info!(
                "Simulation source stopped after {} edges",
                self.edges_emitted.load(Ordering::Relaxed)
            );
        }
        Ok(())
    }

    fn diagnostics(&self) -> Option<SourceDiagnostics> {
        let [p1, p2, p3, p4] = self.positions();
        Some(SourceDiagnostics {
            edges_emitted: self.edges_emitted.load(Ordering::Relaxed),
            custom: Some(format!("positions={p1},{p2},{p3},{p4}")),
        })
    }
}

impl Drop for SimulationSource {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
