//! Value types exchanged between the tracker core and its collaborators.
//!
//! - `Vec3` / `Position3D` - Cartesian vectors in millimetres
//! - `JointAngles` - The four joint angles in radians, 1-based addressing
//! - `Direction` - Encoder counting direction
//! - `Channel` / `ChannelLevels` - Quadrature signal pair

use crate::consts::NUM_AXES;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Cartesian vector in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component (forward from base at θ1 = 0)
    #[serde(default)]
    pub x: f64,
    /// Y component (left from base at θ1 = 0)
    #[serde(default)]
    pub y: f64,
    /// Z component (up)
    #[serde(default)]
    pub z: f64,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a new vector.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Rotate about the Z axis by `angle` radians.
    pub fn rotate_z(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
            z: self.z,
        }
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Tip position snapshot produced once per update cycle.
pub type Position3D = Vec3;

/// Joint angles in radians, index 0 = axis 1 (base).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointAngles(pub [f64; NUM_AXES]);

impl JointAngles {
    /// All joints at zero.
    pub const ZERO: Self = Self([0.0; NUM_AXES]);

    /// Build from four angles in radians.
    pub const fn new(theta1: f64, theta2: f64, theta3: f64, theta4: f64) -> Self {
        Self([theta1, theta2, theta3, theta4])
    }

    /// Build from four angles in degrees.
    pub fn from_degrees(degrees: [f64; NUM_AXES]) -> Self {
        Self(degrees.map(f64::to_radians))
    }

    /// Angle of `axis` (1..=4) in radians; 0.0 for any other axis.
    pub fn theta(&self, axis: usize) -> f64 {
        axis.checked_sub(1)
            .and_then(|idx| self.0.get(idx))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Encoder counting direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Counts are used as decoded.
    #[default]
    Normal,
    /// Counts are negated.
    Reversed,
}

impl Direction {
    /// Sign applied to the adjusted count: +1 or -1.
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Normal => 1,
            Self::Reversed => -1,
        }
    }
}

/// One of the two quadrature channels of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Channel A
    A,
    /// Channel B
    B,
}

/// Logic levels of both channels sampled at the moment of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelLevels {
    /// Level of channel A
    pub a: bool,
    /// Level of channel B
    pub b: bool,
}

impl ChannelLevels {
    /// Create from both levels.
    pub const fn new(a: bool, b: bool) -> Self {
        Self { a, b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_theta_is_one_based() {
        let angles = JointAngles::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(angles.theta(1), 0.1);
        assert_eq!(angles.theta(4), 0.4);
        assert_eq!(angles.theta(0), 0.0);
        assert_eq!(angles.theta(5), 0.0);
    }

    #[test]
    fn test_from_degrees() {
        let angles = JointAngles::from_degrees([90.0, 0.0, -90.0, 180.0]);
        assert!((angles.theta(1) - FRAC_PI_2).abs() < 1e-12);
        assert!((angles.theta(3) + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_z_quarter_turn() {
        let v = Vec3::new(1.0, 0.0, 5.0).rotate_z(FRAC_PI_2);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
        assert_eq!(v.z, 5.0);
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Normal.sign(), 1);
        assert_eq!(Direction::Reversed.sign(), -1);
        assert_eq!(Direction::default(), Direction::Normal);
    }

    #[test]
    fn test_vec3_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vec3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vec3::new(0.5, 1.5, 2.5));
    }
}
