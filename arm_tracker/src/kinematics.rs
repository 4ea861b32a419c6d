//! Forward kinematics.
//!
//! Chain of the arm: θ1 rotates the whole arm about the vertical axis; θ2,
//! θ3 and θ4 are pitch joints in the resulting vertical plane, each measured
//! relative to the previous link. L3 and L4 share the last joint.
//!
//! ```text
//! a2 = θ2, a3 = θ2 + θ3, a4 = θ2 + θ3 + θ4
//! planar_x = L1·cos a2 + L2·cos a3 + (L3 + L4)·cos a4
//! planar_z = L1·sin a2 + L2·sin a3 + (L3 + L4)·sin a4
//! raw = (planar_x·cos θ1, planar_x·sin θ1, planar_z) + rot_z(θ1)·tool
//! position = raw − origin
//! ```
//!
//! Angles are not normalized and geometry is not validated.

use arm::arm::config::GeometryConfig;
use arm::arm::types::{JointAngles, Position3D, Vec3};
use arm::consts::{DEFAULT_LINK_LENGTHS_MM, NUM_AXES};
use tracing::debug;

/// Arm dimensions plus the calibration origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkageGeometry {
    /// Link lengths L1..L4 in millimetres
    pub links: [f64; NUM_AXES],
    /// Tip offset in the wrist frame
    pub tool_offset: Vec3,
    /// Subtracted from every computed position
    pub origin_offset: Vec3,
}

impl Default for LinkageGeometry {
    fn default() -> Self {
        Self {
            links: DEFAULT_LINK_LENGTHS_MM,
            tool_offset: Vec3::ZERO,
            origin_offset: Vec3::ZERO,
        }
    }
}

impl From<&GeometryConfig> for LinkageGeometry {
    fn from(config: &GeometryConfig) -> Self {
        Self {
            links: config.links,
            tool_offset: config.tool_offset,
            origin_offset: Vec3::ZERO,
        }
    }
}

/// Tip position before the origin is subtracted.
pub fn raw_position(angles: &JointAngles, geometry: &LinkageGeometry) -> Position3D {
    let [theta1, theta2, theta3, theta4] = angles.0;
    let [l1, l2, l3, l4] = geometry.links;

    let abs2 = theta2;
    let abs3 = theta2 + theta3;
    let abs4 = theta2 + theta3 + theta4;

    let (sin2, cos2) = abs2.sin_cos();
    let (sin3, cos3) = abs3.sin_cos();
    let (sin4, cos4) = abs4.sin_cos();

    let planar_x = l1 * cos2 + l2 * cos3 + (l3 + l4) * cos4;
    let planar_z = l1 * sin2 + l2 * sin3 + (l3 + l4) * sin4;

    let (sin1, cos1) = theta1.sin_cos();
    let arm_tip = Vec3::new(planar_x * cos1, planar_x * sin1, planar_z);

    arm_tip + geometry.tool_offset.rotate_z(theta1)
}

/// Tip position relative to the captured origin.
#[inline]
pub fn forward_kinematics(angles: &JointAngles, geometry: &LinkageGeometry) -> Position3D {
    raw_position(angles, geometry) - geometry.origin_offset
}

/// Holds the current geometry and the last computed position.
#[derive(Debug, Clone, Default)]
pub struct ForwardKinematicsEngine {
    geometry: LinkageGeometry,
    position: Position3D,
}

impl ForwardKinematicsEngine {
    /// Create an engine with the given geometry.
    pub fn new(geometry: LinkageGeometry) -> Self {
        Self {
            geometry,
            position: Position3D::ZERO,
        }
    }

    /// Compute and store the position for `angles`.
    pub fn calculate(&mut self, angles: &JointAngles) -> Position3D {
        self.position = forward_kinematics(angles, &self.geometry);
        self.position
    }

    /// Position from the most recent [`calculate`](Self::calculate).
    ///
    /// Setters do not recompute it; the host `GETPOS` command runs a fresh
    /// cycle first, so it always reflects the current geometry.
    pub fn position(&self) -> Position3D {
        self.position
    }

    /// Position before origin subtraction, with the current geometry.
    pub fn raw_position(&self, angles: &JointAngles) -> Position3D {
        raw_position(angles, &self.geometry)
    }

    /// Replace all four link lengths.
    pub fn set_dimensions(&mut self, l1: f64, l2: f64, l3: f64, l4: f64) {
        self.geometry.links = [l1, l2, l3, l4];
        debug!("Dimensions set: {:?}", self.geometry.links);
    }

    /// Replace the tool offset.
    pub fn set_tool_offset(&mut self, x: f64, y: f64, z: f64) {
        self.geometry.tool_offset = Vec3::new(x, y, z);
        debug!("Tool offset set: {:?}", self.geometry.tool_offset);
    }

    /// Replace the origin offset.
    pub fn set_origin_offset(&mut self, x: f64, y: f64, z: f64) {
        self.geometry.origin_offset = Vec3::new(x, y, z);
    }

    /// Make the raw position at `angles` the new origin.
    ///
    /// The origin is a fixed vector; later geometry changes do not move it.
    pub fn capture_origin(&mut self, angles: &JointAngles) -> Vec3 {
        let origin = self.raw_position(angles);
        self.geometry.origin_offset = origin;
        debug!("Origin captured at {:?}", origin);
        origin
    }

    /// Replace the whole geometry.
    pub fn set_geometry(&mut self, geometry: LinkageGeometry) {
        self.geometry = geometry;
    }

    /// Current geometry.
    pub fn geometry(&self) -> &LinkageGeometry {
        &self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    fn assert_close(actual: Vec3, expected: Vec3) {
        assert!(
            (actual.x - expected.x).abs() < EPS
                && (actual.y - expected.y).abs() < EPS
                && (actual.z - expected.z).abs() < EPS,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn home_pose_reaches_sum_of_links() {
        let mut engine = ForwardKinematicsEngine::default();
        let p = engine.calculate(&JointAngles::ZERO);
        assert_eq!(p, Vec3::new(797.0, 0.0, 0.0));
        assert_eq!(engine.position(), p);
    }

    #[test]
    fn base_quarter_turn_points_along_y() {
        let mut engine = ForwardKinematicsEngine::default();
        let p = engine.calculate(&JointAngles::new(FRAC_PI_2, 0.0, 0.0, 0.0));
        assert_close(p, Vec3::new(0.0, 797.0, 0.0));
    }

    #[test]
    fn shoulder_up_lifts_whole_arm() {
        let engine = ForwardKinematicsEngine::default();
        let p = engine.raw_position(&JointAngles::new(0.0, FRAC_PI_2, 0.0, 0.0));
        assert_close(p, Vec3::new(0.0, 0.0, 797.0));
    }

    #[test]
    fn elbow_fold_is_relative_to_shoulder() {
        let engine = ForwardKinematicsEngine::default();
        // L1 forward, L2 + (L3 + L4) straight up
        let p = engine.raw_position(&JointAngles::new(0.0, 0.0, FRAC_PI_2, 0.0));
        assert_close(p, Vec3::new(254.0, 0.0, 543.0));

        // folded back on itself
        let p = engine.raw_position(&JointAngles::new(0.0, 0.0, PI, 0.0));
        assert_close(p, Vec3::new(254.0 - 543.0, 0.0, 0.0));
    }

    #[test]
    fn zero_links_leave_rotated_tool_minus_origin() {
        let mut engine = ForwardKinematicsEngine::default();
        engine.set_dimensions(0.0, 0.0, 0.0, 0.0);
        engine.set_tool_offset(10.0, 5.0, -3.0);
        engine.set_origin_offset(1.0, 2.0, 3.0);

        for theta1 in [0.0, 0.3, FRAC_PI_2, PI, -2.0] {
            for other in [0.0, 0.7, -1.9] {
                let angles = JointAngles::new(theta1, other, -other, other * 2.0);
                let expected = Vec3::new(10.0, 5.0, -3.0).rotate_z(theta1) - Vec3::new(1.0, 2.0, 3.0);
                assert_close(engine.calculate(&angles), expected);
            }
        }
    }

    #[test]
    fn calculate_is_bit_identical() {
        let mut engine = ForwardKinematicsEngine::default();
        engine.set_tool_offset(3.5, -1.25, 40.0);
        let angles = JointAngles::new(0.123, -0.456, 1.789, -2.5);
        let first = engine.calculate(&angles);
        for _ in 0..100 {
            let again = engine.calculate(&angles);
            assert_eq!(first.x.to_bits(), again.x.to_bits());
            assert_eq!(first.y.to_bits(), again.y.to_bits());
            assert_eq!(first.z.to_bits(), again.z.to_bits());
        }
    }

    #[test]
    fn position_is_stale_until_next_calculate() {
        let mut engine = ForwardKinematicsEngine::default();
        engine.calculate(&JointAngles::ZERO);
        engine.set_dimensions(100.0, 50.0, 25.0, 5.0);
        assert_eq!(engine.position(), Vec3::new(797.0, 0.0, 0.0));
        assert_eq!(engine.calculate(&JointAngles::ZERO), Vec3::new(180.0, 0.0, 0.0));
        assert_eq!(engine.position(), Vec3::new(180.0, 0.0, 0.0));
    }

    #[test]
    fn negative_links_are_used_as_given() {
        let mut engine = ForwardKinematicsEngine::default();
        engine.set_dimensions(-100.0, 0.0, 0.0, 0.0);
        assert_eq!(engine.calculate(&JointAngles::ZERO), Vec3::new(-100.0, 0.0, 0.0));
    }

    #[test]
    fn angles_are_not_wrapped() {
        let engine = ForwardKinematicsEngine::default();
        let a = engine.raw_position(&JointAngles::new(0.4, 0.2, 0.1, 0.0));
        let b = engine.raw_position(&JointAngles::new(0.4 + 2.0 * PI, 0.2, 0.1, 0.0));
        assert_close(a, b);
    }

    #[test]
    fn captured_origin_zeroes_current_pose() {
        let mut engine = ForwardKinematicsEngine::default();
        let pose = JointAngles::new(0.5, 0.25, -0.75, 0.1);
        let origin = engine.capture_origin(&pose);
        assert_eq!(engine.geometry().origin_offset, origin);
        assert_eq!(engine.calculate(&pose), Vec3::ZERO);

        engine.set_dimensions(1.0, 1.0, 1.0, 1.0);
        assert_eq!(engine.geometry().origin_offset, origin);
    }

    #[test]
    fn geometry_from_config() {
        let config = GeometryConfig {
            links: [1.0, 2.0, 3.0, 4.0],
            tool_offset: Vec3::new(0.0, 0.0, 9.0),
        };
        let mut engine = ForwardKinematicsEngine::default();
        engine.set_geometry(LinkageGeometry::from(&config));
        assert_eq!(engine.geometry().links, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(engine.geometry().origin_offset, Vec3::ZERO);
        assert_eq!(engine.calculate(&JointAngles::ZERO), Vec3::new(10.0, 0.0, 9.0));
    }
}
