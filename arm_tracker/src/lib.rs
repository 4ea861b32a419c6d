//! # Arm Tracker Library
//!
//! Pose tracking for a 4-axis digitizing arm: quadrature decoding, joint
//! angle calibration and forward kinematics, plus the host-side service
//! that drives them.
//!
//! # Module Structure
//!
//! - [`encoder`] - Quadrature decoder and the shared per-axis counters
//! - [`tracker`] - `AngleTracker`, counts to calibrated angles
//! - [`kinematics`] - `ForwardKinematicsEngine`, angles to tip position
//! - [`protocol`] - Host command parsing and responses
//! - [`core`] - `TrackerCore`, update loop
//! - [`source_registry`] - Edge source factory registration
//! - [`sources`] - Edge source implementations
//!
//! # Architecture
//!
//! ```text
//!        edge context            │         polling loop (TrackerCore)
//!                                │
//!  ┌──────────────┐  on_edge()   │  ┌──────────────┐  angles  ┌──────────────────┐
//!  │  EdgeSource  │─────────┐    │  │ AngleTracker │─────────►│ ForwardKinematics│
//!  └──────────────┘         ▼    │  └──────▲───────┘          │ Engine           │
//!                    ┌─────────────┐      │ snapshot()       └────────┬─────────┘
//!                    │ DecoderBank │──► EncoderCounter ×4             │
//!                    └─────────────┘    (AtomicU64 per axis)     POS / ACK / ERROR
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod core;
pub mod encoder;
pub mod kinematics;
pub mod protocol;
pub mod source_registry;
pub mod sources;
pub mod tracker;

pub use crate::core::{TrackerCore, TrackerError};
pub use crate::encoder::{DecoderBank, EncoderCounter, QuadratureDecoder};
pub use crate::kinematics::{ForwardKinematicsEngine, LinkageGeometry};
pub use crate::source_registry::SourceRegistry;
pub use crate::tracker::AngleTracker;
