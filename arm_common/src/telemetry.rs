//! `POS` telemetry record.
//!
//! Wire format, one ASCII line per update cycle:
//!
//! ```text
//! POS,<millis>,<x>,<y>,<z>,<theta1_deg>,<theta2_deg>,<theta3_deg>,<theta4_deg>\n
//! ```
//!
//! Coordinates carry 3 decimals, angles 2. `Display` renders the line
//! without the trailing newline; writers append it.

use crate::arm::types::Position3D;
use crate::consts::NUM_AXES;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Record prefix.
pub const POS_PREFIX: &str = "POS";

/// Number of comma-separated fields in a record, prefix included.
pub const POS_FIELD_COUNT: usize = 5 + NUM_AXES;

/// Error returned when a line is not a valid `POS` record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryParseError {
    /// Line does not start with `POS`
    #[error("Not a POS record")]
    WrongPrefix,

    /// Wrong number of fields
    #[error("Expected 9 fields, found {0}")]
    FieldCount(usize),

    /// A field is not a number
    #[error("Invalid field {index}: {value}")]
    InvalidField {
        /// Field index (0 = prefix)
        index: usize,
        /// Offending text
        value: String,
    },
}

/// One telemetry sample as sent to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    /// Milliseconds since tracker start
    pub millis: u64,
    /// Tip position in millimetres
    pub position: Position3D,
    /// Joint angles in degrees, axis 1 first
    pub angles_deg: [f64; NUM_AXES],
}

/// Printed value with negative zero folded to zero.
#[inline]
fn unsigned_zero(value: f64) -> f64 {
    value + 0.0
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{:.3},{:.3},{:.3}",
            POS_PREFIX,
            self.millis,
            unsigned_zero(self.position.x),
            unsigned_zero(self.position.y),
            unsigned_zero(self.position.z),
        )?;
        for angle in self.angles_deg {
            write!(f, ",{:.2}", unsigned_zero(angle))?;
        }
        Ok(())
    }
}

impl FromStr for TelemetryRecord {
    type Err = TelemetryParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        if fields.first() != Some(&POS_PREFIX) {
            return Err(TelemetryParseError::WrongPrefix);
        }
        if fields.len() != POS_FIELD_COUNT {
            return Err(TelemetryParseError::FieldCount(fields.len()));
        }

        let number = |index: usize| -> Result<f64, TelemetryParseError> {
            fields[index]
                .trim()
                .parse::<f64>()
                .map_err(|_| TelemetryParseError::InvalidField {
                    index,
                    value: fields[index].to_string(),
                })
        };

        let millis = fields[1]
            .trim()
            .parse::<u64>()
            .map_err(|_| TelemetryParseError::InvalidField {
                index: 1,
                value: fields[1].to_string(),
            })?;

        let mut angles_deg = [0.0; NUM_AXES];
        for (i, angle) in angles_deg.iter_mut().enumerate() {
            *angle = number(5 + i)?;
        }

        Ok(Self {
            millis,
            position: Position3D::new(number(2)?, number(3)?, number(4)?),
            angles_deg,
        })
    }
}
