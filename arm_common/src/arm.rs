//! Arm configuration and value types.
//!
//! This module contains the types shared between the tracker core and its
//! collaborators:
//! - [`config`] - `ArmConfig` loaded from `arm.toml`
//! - [`types`] - Vectors, joint angles, encoder channels
//! - [`source`] - `EdgeSource` / `EdgeSink` seam between signal producers and decoders

pub mod config;
pub mod source;
pub mod types;
