//! Arm configuration types.
//!
//! This module contains the configuration loaded from `arm.toml`:
//! - `ArmConfig` - Main configuration
//! - `EncoderConfig` / `AxisConfig` - Encoder resolution and per-axis calibration
//! - `GeometryConfig` - Link lengths and tool offset
//!
//! Validation here belongs to the configuration collaborator. The tracker
//! core accepts whatever it is handed; geometry is never validated.

use crate::arm::types::{Direction, Vec3};
use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_AXIS_NAMES, DEFAULT_LINK_LENGTHS_MM, DEFAULT_PPR, DEFAULT_SOURCE,
    DEFAULT_UPDATE_INTERVAL_MS, NUM_AXES, QUADRATURE_MULTIPLIER,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

fn default_update_interval_ms() -> u32 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_ppr() -> u32 {
    DEFAULT_PPR
}

fn default_multiplier() -> u32 {
    QUADRATURE_MULTIPLIER
}

fn default_axes() -> Vec<AxisConfig> {
    DEFAULT_AXIS_NAMES
        .iter()
        .map(|name| AxisConfig {
            name: name.to_string(),
            direction: Direction::Normal,
            zero_offset: 0,
        })
        .collect()
}

fn default_links() -> [f64; NUM_AXES] {
    DEFAULT_LINK_LENGTHS_MM
}

/// Main configuration loaded from `arm.toml`.
///
/// Top-level keys must precede the first table in the TOML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    /// Update cycle period in milliseconds.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u32,

    /// Name of the edge source to load (e.g., "simulation").
    #[serde(default = "default_source")]
    pub source: String,

    /// Common service settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Encoder resolution and per-axis calibration.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Arm dimensions.
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Per-source configuration sections.
    /// Key = source name, Value = source-specific TOML table.
    #[serde(default)]
    pub source_config: HashMap<String, toml::Value>,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            source: default_source(),
            shared: SharedConfig::default(),
            encoder: EncoderConfig::default(),
            geometry: GeometryConfig::default(),
            source_config: HashMap::new(),
        }
    }
}

impl ArmConfig {
    /// Validate the arm configuration.
    ///
    /// # Validation Rules
    /// 1. `update_interval_ms` > 0
    /// 2. `encoder.ppr` > 0 and `encoder.multiplier` > 0
    /// 3. exactly `NUM_AXES` axis entries
    /// 4. axis names non-empty and unique
    /// 5. `shared` section valid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.update_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "update_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.encoder.ppr == 0 {
            return Err(ConfigError::ValidationError(
                "encoder.ppr must be greater than 0".to_string(),
            ));
        }

        if self.encoder.multiplier == 0 {
            return Err(ConfigError::ValidationError(
                "encoder.multiplier must be greater than 0".to_string(),
            ));
        }

        if self.encoder.axes.len() != NUM_AXES {
            return Err(ConfigError::ValidationError(format!(
                "Expected {} encoder axes, found {}",
                NUM_AXES,
                self.encoder.axes.len()
            )));
        }

        let mut names = HashSet::new();
        for (idx, axis) in self.encoder.axes.iter().enumerate() {
            if axis.name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Axis {} has an empty name",
                    idx + 1
                )));
            }
            if !names.insert(axis.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate axis name: {}",
                    axis.name
                )));
            }
        }

        Ok(())
    }

    /// Deserialize the `[source_config.<name>]` table.
    ///
    /// Returns `T::default()` when the table is absent.
    pub fn source_table<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, ConfigError> {
        match self.source_config.get(name) {
            Some(value) => value.clone().try_into().map_err(|e| {
                ConfigError::ParseError(format!("source_config.{name}: {e}"))
            }),
            None => {
                debug!("No source_config.{} table, using defaults", name);
                Ok(T::default())
            }
        }
    }
}

/// Encoder resolution and per-axis calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Pulses per revolution.
    #[serde(default = "default_ppr")]
    pub ppr: u32,

    /// Quadrature multiplier (4 = every edge of both channels).
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,

    /// Per-axis calibration, base to wrist.
    #[serde(default = "default_axes")]
    pub axes: Vec<AxisConfig>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ppr: default_ppr(),
            multiplier: default_multiplier(),
            axes: default_axes(),
        }
    }
}

impl EncoderConfig {
    /// Counts per full revolution (`ppr × multiplier`).
    pub fn counts_per_revolution(&self) -> u32 {
        self.ppr.saturating_mul(self.multiplier)
    }
}

/// Per-axis encoder calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Axis name (unique)
    pub name: String,

    /// Counting direction
    #[serde(default)]
    pub direction: Direction,

    /// Raw count treated as angle zero at startup
    #[serde(default)]
    pub zero_offset: i32,
}

/// Arm dimensions in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Link lengths L1..L4
    #[serde(default = "default_links")]
    pub links: [f64; NUM_AXES],

    /// Wrist-to-tip offset in the wrist frame
    #[serde(default)]
    pub tool_offset: Vec3,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            links: default_links(),
            tool_offset: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn test_default_config_is_valid() {
        let config = ArmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.encoder.counts_per_revolution(), 2400);
        assert_eq!(config.encoder.axes.len(), NUM_AXES);
        assert_eq!(config.geometry.links, DEFAULT_LINK_LENGTHS_MM);
        assert_eq!(config.source, "simulation");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ArmConfig::from_toml("").unwrap();
        assert_eq!(config.update_interval_ms, DEFAULT_UPDATE_INTERVAL_MS);
        assert_eq!(config.encoder.ppr, DEFAULT_PPR);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_document() {
        let doc = r#"
update_interval_ms = 20
source = "simulation"

[encoder]
ppr = 1000

[[encoder.axes]]
name = "base"
direction = "reversed"
zero_offset = 12

[[encoder.axes]]
name = "shoulder"

[[encoder.axes]]
name = "elbow"

[[encoder.axes]]
name = "wrist"
zero_offset = -7

[geometry]
links = [300.0, 250.0, 200.0, 40.0]
tool_offset = { x = 1.0, z = 10.0 }

[source_config.simulation]
amplitude_counts = 100
"#;
        let config = ArmConfig::from_toml(doc).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.update_interval_ms, 20);
        assert_eq!(config.encoder.counts_per_revolution(), 4000);
        assert_eq!(config.encoder.axes[0].direction, Direction::Reversed);
        assert_eq!(config.encoder.axes[0].zero_offset, 12);
        assert_eq!(config.encoder.axes[3].zero_offset, -7);
        assert_eq!(config.geometry.tool_offset, Vec3::new(1.0, 0.0, 10.0));
        assert!(config.source_config.contains_key("simulation"));
    }

    #[test]
    fn test_validate_rejects_zero_ppr() {
        let mut config = ArmConfig::default();
        config.encoder.ppr = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ArmConfig::default();
        config.update_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_axis_count() {
        let mut config = ArmConfig::default();
        config.encoder.axes.pop();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Expected 4 encoder axes"));
    }

    #[test]
    fn test_validate_rejects_duplicate_axis_names() {
        let mut config = ArmConfig::default();
        config.encoder.axes[2].name = "base".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate axis name"));
    }

    #[test]
    fn test_negative_links_are_accepted() {
        let mut config = ArmConfig::default();
        config.geometry.links = [-10.0, 0.0, 0.0, 0.0];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_source_table_defaults_when_missing() {
        #[derive(Debug, Default, Deserialize, PartialEq)]
        struct Table {
            #[serde(default)]
            rate: u32,
        }

        let config = ArmConfig::default();
        let table: Table = config.source_table("missing").unwrap();
        assert_eq!(table, Table::default());
    }

    #[test]
    fn test_source_table_parse_error() {
        #[derive(Debug, Default, Deserialize)]
        #[allow(dead_code)]
        struct Table {
            rate: u32,
        }

        let config = ArmConfig::from_toml(
            "[source_config.simulation]\nrate = \"fast\"\n",
        )
        .unwrap();
        let result: Result<Table, _> = config.source_table("simulation");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
