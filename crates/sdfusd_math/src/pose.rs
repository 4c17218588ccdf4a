// Rigid transform shared by the physics-description tree and the scene graph.
//
// SDF writes poses as `x y z roll pitch yaw` with fixed-axis rotations applied
// roll (X) first, then pitch (Y), then yaw (Z). That is the same matrix as
// glam's intrinsic ZYX Euler order, which is what the helpers below use.

use glam::{DMat4, DQuat, DVec3, EulerRot};
use std::ops::Mul;

/// Position plus orientation, parent-relative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    pub fn from_translation(position: DVec3) -> Self {
        Self::new(position, DQuat::IDENTITY)
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self::new(DVec3::ZERO, rotation)
    }

    /// Build a pose from SDF's `x y z roll pitch yaw` (radians).
    pub fn from_xyz_rpy(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::new(
            DVec3::new(x, y, z),
            DQuat::from_euler(EulerRot::ZYX, yaw, pitch, roll),
        )
    }

    /// Roll, pitch and yaw in radians, in that order.
    pub fn rpy(&self) -> DVec3 {
        let (yaw, pitch, roll) = self.rotation.normalize().to_euler(EulerRot::ZYX);
        DVec3::new(roll, pitch, yaw)
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self::new(rotation * -self.position, rotation)
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.position + self.rotation * point
    }

    pub fn is_identity(&self) -> bool {
        self.abs_diff_eq(&Self::IDENTITY, crate::EPSILON)
    }

    /// Compare two poses; `q` and `-q` are the same rotation.
    pub fn abs_diff_eq(&self, other: &Pose, epsilon: f64) -> bool {
        if !self.position.abs_diff_eq(other.position, epsilon) {
            return false;
        }
        let dot = self.rotation.normalize().dot(other.rotation.normalize());
        (1.0 - dot.abs()) <= epsilon
    }

    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Split an affine matrix into a pose and the scale it carried.
    pub fn from_matrix(matrix: &DMat4) -> (Pose, DVec3) {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        (Pose::new(translation, rotation.normalize()), scale)
    }
}

impl Mul for Pose {
    type Output = Pose;

    /// `parent * child` expresses `child` in the frame `parent` is expressed in.
    fn mul(self, child: Pose) -> Pose {
        Pose::new(
            self.position + self.rotation * child.position,
            (self.rotation * child.rotation).normalize(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rpy_roundtrip() {
        let pose = Pose::from_xyz_rpy(1.0, 2.0, 3.0, 0.1, -0.4, 1.2);
        let rpy = pose.rpy();
        assert_relative_eq!(rpy.x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(rpy.y, -0.4, epsilon = 1e-12);
        assert_relative_eq!(rpy.z, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_yaw_rotates_x_to_y() {
        let pose = Pose::from_xyz_rpy(0.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2);
        let v = pose.transform_point(DVec3::X);
        assert!(v.abs_diff_eq(DVec3::Y, 1e-12));
    }

    #[test]
    fn test_roll_applied_before_yaw() {
        // Roll takes Y to Z; the subsequent yaw leaves Z alone.
        let pose = Pose::from_xyz_rpy(0.0, 0.0, 0.0, FRAC_PI_2, 0.0, FRAC_PI_2);
        let v = pose.transform_point(DVec3::Y);
        assert!(v.abs_diff_eq(DVec3::Z, 1e-12));
    }

    #[test]
    fn test_compose_and_inverse() {
        let parent = Pose::from_xyz_rpy(1.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2);
        let child = Pose::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let world = parent * child;
        assert!(world.position.abs_diff_eq(DVec3::new(1.0, 1.0, 0.0), 1e-12));
        assert!((parent.inverse() * world).abs_diff_eq(&child, 1e-12));
    }

    #[test]
    fn test_matrix_roundtrip_with_scale() {
        let pose = Pose::from_xyz_rpy(0.0, 0.0, 2.5, 0.3, 0.2, 0.1);
        let scaled = pose.to_matrix() * DMat4::from_scale(DVec3::new(2.0, 3.0, 4.0));
        let (back, scale) = Pose::from_matrix(&scaled);
        assert!(back.abs_diff_eq(&pose, 1e-9));
        assert!(scale.abs_diff_eq(DVec3::new(2.0, 3.0, 4.0), 1e-9));
    }

    #[test]
    fn test_negated_quaternion_is_equal() {
        let a = Pose::from_xyz_rpy(0.0, 0.0, 0.0, 0.5, 0.0, 0.0);
        let b = Pose::new(a.position, -a.rotation);
        assert!(a.abs_diff_eq(&b, 1e-12));
    }
}
