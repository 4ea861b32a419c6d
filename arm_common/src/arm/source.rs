//! Edge source trait and error types.
//!
//! This module defines:
//! - `EdgeSink` trait - Receiver of quadrature edges (implemented by the decoder bank)
//! - `EdgeSource` trait - Interface for pluggable edge producers
//! - `SourceError` enum - Error types for source operations
//! - `SourceFactory` type alias - Factory function type
//! - `SourceDiagnostics` struct - Optional source diagnostics

use crate::arm::config::ArmConfig;
use crate::arm::types::{Channel, ChannelLevels};
use std::sync::Arc;
use thiserror::Error;

/// Error types for edge source operations.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Source initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Source not found
    #[error("Edge source not found: {0}")]
    SourceNotFound(String),

    /// Edge context could not be started
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// Source was started twice
    #[error("Edge source already running: {0}")]
    AlreadyRunning(String),
}

/// Factory function type for creating source instances.
pub type SourceFactory = fn() -> Box<dyn EdgeSource>;

/// Optional source diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SourceDiagnostics {
    /// Number of edges delivered to the sink
    pub edges_emitted: u64,
    /// Source-specific details (free text)
    pub custom: Option<String>,
}

/// Receiver of quadrature edges.
///
/// Called from the edge context (interrupt handler or source thread).
///
/// # Contract
///
/// - `axis` is 1-based; edges for any other axis are dropped
/// - Must complete in bounded time: no blocking, no allocation, no I/O
pub trait EdgeSink: Send + Sync {
    /// Deliver one transition of `channel` on `axis`, with both channel
    /// levels as read right after the transition.
    fn on_edge(&self, axis: usize, channel: Channel, levels: ChannelLevels);

    /// Deliver one polled reading of both channels of `axis`.
    ///
    /// Sources that cannot observe individual transitions sample the
    /// levels instead; the sink decodes against the previous reading.
    fn on_sample(&self, axis: usize, levels: ChannelLevels);
}

/// Trait defining the interface for edge sources.
///
/// An edge source owns the asynchronous context that produces quadrature
/// transitions (hardware interrupts, a simulation thread, a replay file).
///
/// # Lifecycle
///
/// 1. `init()` - Called once with the arm configuration
/// 2. `start()` - Begins delivering edges to the sink from the edge context
/// 3. `shutdown()` - Stops delivery; no edge reaches the sink afterwards
pub trait EdgeSource: Send {
    /// Returns the source's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the source's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the source with arm configuration.
    ///
    /// Source-specific settings come from `config.source_config[name()]`.
    ///
    /// # Errors
    /// Return `SourceError::ConfigError` if the source table is malformed.
    fn init(&mut self, config: &ArmConfig) -> Result<(), SourceError>;

    /// Start delivering edges to `sink`.
    ///
    /// # Errors
    /// Return `SourceError::AlreadyRunning` if called twice without shutdown.
    fn start(&mut self, sink: Arc<dyn EdgeSink>) -> Result<(), SourceError>;

    /// Stop delivering edges and release the edge context.
    fn shutdown(&mut self) -> Result<(), SourceError>;

    /// Get source-specific diagnostics.
    /// Default: None
    fn diagnostics(&self) -> Option<SourceDiagnostics> {
        None
    }
}
