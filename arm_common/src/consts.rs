//! System-wide constants for the arm tracker workspace.
//!
//! Single source of truth for axis count, encoder resolution and default
//! arm dimensions. Imported by all crates.

use static_assertions::const_assert;

/// Number of tracked joints (1 = base, 4 = wrist).
pub const NUM_AXES: usize = 4;

/// Default encoder pulses per revolution.
pub const DEFAULT_PPR: u32 = 600;

/// Quadrature multiplier: every edge of both channels is counted.
pub const QUADRATURE_MULTIPLIER: u32 = 4;

/// Default update cycle period in milliseconds (20 Hz).
pub const DEFAULT_UPDATE_INTERVAL_MS: u32 = 50;

/// Default link lengths in millimetres, base to tip.
pub const DEFAULT_LINK_LENGTHS_MM: [f64; NUM_AXES] = [254.0, 254.0, 254.0, 35.0];

/// Default axis names, base to wrist.
pub const DEFAULT_AXIS_NAMES: [&str; NUM_AXES] = ["base", "shoulder", "elbow", "wrist"];

/// Default edge source name.
pub const DEFAULT_SOURCE: &str = "simulation";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/arm/arm.toml";

/// Canonical service name (used for logging).
pub const TRACKER_SERVICE_NAME: &str = "arm-tracker";

/// Protocol firmware version reported by `VERSION` and `INFO`.
pub const PROTOCOL_VERSION: &str = "1.0.2";

/// Protocol release date reported by `VERSION`.
pub const PROTOCOL_DATE: &str = "2025-11-20";

/// Command line buffer size in bytes (including room for the terminator).
pub const COMMAND_BUFFER_SIZE: usize = 128;

/// Largest PPR accepted by the command protocol.
pub const MAX_PROTOCOL_PPR: u32 = 10_000;

const_assert!(NUM_AXES == 4);
const_assert!(DEFAULT_PPR > 0);
const_assert!(QUADRATURE_MULTIPLIER > 0);
