//! Arm Common Library
//!
//! Shared constants, configuration loading and wire formats for the
//! digitizing arm tracker workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Axis count, encoder and geometry defaults
//! - [`config`] - Configuration loading traits and types
//! - [`arm`] - Arm configuration, value types and the edge-source seam
//! - [`telemetry`] - `POS` telemetry record wire format
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! arm = { package = "arm_common", path = "../arm_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use arm_common::consts::NUM_AXES;
//! use arm_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod arm;
pub mod config;
pub mod consts;
pub mod prelude;
pub mod telemetry;
