//! Prelude module for common re-exports.
//!
//! ```rust
//! use arm_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::arm::config::{ArmConfig, AxisConfig, EncoderConfig, GeometryConfig};
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── Arm types ──────────────────────────────────────────────────────
pub use crate::arm::source::{EdgeSink, EdgeSource, SourceError};
pub use crate::arm::types::{Channel, ChannelLevels, Direction, JointAngles, Position3D, Vec3};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_UPDATE_INTERVAL_MS, NUM_AXES, QUADRATURE_MULTIPLIER};

// ─── Telemetry ──────────────────────────────────────────────────────
pub use crate::telemetry::TelemetryRecord;

/// Default update cycle period as Duration.
pub const DEFAULT_UPDATE_INTERVAL: Duration =
    Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS as u64);
