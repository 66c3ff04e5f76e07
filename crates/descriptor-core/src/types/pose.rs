//! Rigid transforms and the pose type written to the description

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// Determinant below which a rotation block is treated as non-invertible
const SINGULAR_EPSILON: f64 = 1e-9;

/// Pose (position and orientation)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub xyz: [f64; 3],
    pub rpy: [f64; 3], // roll, pitch, yaw in radians
}

impl Pose {
    pub fn new(xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        Self { xyz, rpy }
    }

    pub fn from_position(xyz: [f64; 3]) -> Self {
        Self { xyz, rpy: [0.0; 3] }
    }

    /// Build a pose from a transform, scaling the translation only
    pub fn from_transform(transform: &RigidTransform, scale: f64) -> Self {
        Self {
            xyz: (transform.translation * scale).to_array(),
            rpy: transform.rpy(),
        }
    }

    pub fn to_transform(&self) -> RigidTransform {
        RigidTransform::from_rpy(DVec3::from(self.xyz), self.rpy)
    }
}

/// Rotation + translation, used for every frame computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: DMat3,
    pub translation: DVec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            rotation: DMat3::IDENTITY,
            translation,
        }
    }

    /// Fixed-axis roll, pitch, yaw (R = Rz * Ry * Rx)
    pub fn from_rpy(translation: DVec3, rpy: [f64; 3]) -> Self {
        let rotation = DMat3::from_rotation_z(rpy[2])
            * DMat3::from_rotation_y(rpy[1])
            * DMat3::from_rotation_x(rpy[0]);
        Self {
            rotation,
            translation,
        }
    }

    /// Read a row-major 4x4 matrix as exposed by CAD hosts.
    ///
    /// Returns `None` when the rotation block cannot be inverted.
    pub fn from_row_major(m: &[f64; 16]) -> Option<Self> {
        let rotation = DMat3::from_cols(
            DVec3::new(m[0], m[4], m[8]),
            DVec3::new(m[1], m[5], m[9]),
            DVec3::new(m[2], m[6], m[10]),
        );
        let translation = DVec3::new(m[3], m[7], m[11]);
        if !rotation.is_finite()
            || !translation.is_finite()
            || rotation.determinant().abs() < SINGULAR_EPSILON
        {
            return None;
        }
        Some(Self {
            rotation,
            translation,
        })
    }

    /// `self * other`: apply `other` first, then `self`
    pub fn compose(&self, other: &RigidTransform) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    /// Same rotation, translation replaced
    pub fn with_translation(&self, translation: DVec3) -> Self {
        Self {
            rotation: self.rotation,
            translation,
        }
    }

    /// Roll, pitch, yaw of the rotation block
    pub fn rpy(&self) -> [f64; 3] {
        let m = &self.rotation;
        // m.<col>_axis.<row>
        let r00 = m.x_axis.x;
        let r10 = m.x_axis.y;
        let r20 = m.x_axis.z;
        let r21 = m.y_axis.z;
        let r22 = m.z_axis.z;

        let cos_pitch = (r00 * r00 + r10 * r10).sqrt();
        let pitch = (-r20).atan2(cos_pitch);
        if cos_pitch > SINGULAR_EPSILON {
            [r21.atan2(r22), pitch, r10.atan2(r00)]
        } else {
            // Gimbal lock: roll folded into yaw
            let r01 = m.y_axis.x;
            let r11 = m.y_axis.y;
            [0.0, pitch, (-r01).atan2(r11)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_transform_eq(a: &RigidTransform, b: &RigidTransform) {
        for (x, y) in a
            .rotation
            .to_cols_array()
            .iter()
            .zip(b.rotation.to_cols_array().iter())
        {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
        assert_relative_eq!(a.translation.x, b.translation.x, epsilon = 1e-12);
        assert_relative_eq!(a.translation.y, b.translation.y, epsilon = 1e-12);
        assert_relative_eq!(a.translation.z, b.translation.z, epsilon = 1e-12);
    }

    #[test]
    fn test_row_major_translation() {
        let m = [
            1.0, 0.0, 0.0, 1.0, //
            0.0, 1.0, 0.0, 2.0, //
            0.0, 0.0, 1.0, 3.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let t = RigidTransform::from_row_major(&m).unwrap();
        assert_eq!(t.translation, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.rotation, DMat3::IDENTITY);
    }

    #[test]
    fn test_row_major_rotation_layout() {
        // 90 degrees about Z: x -> y
        let m = [
            0.0, -1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let t = RigidTransform::from_row_major(&m).unwrap();
        let p = t.transform_point(DVec3::X);
        assert_relative_eq!(p.y, 1.0);
        assert_relative_eq!(p.x, 0.0);
        assert_relative_eq!(t.rpy()[2], std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let m = [0.0; 16];
        assert!(RigidTransform::from_row_major(&m).is_none());
    }

    #[test]
    fn test_non_finite_translation_rejected() {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[7] = f64::NAN;
        assert!(RigidTransform::from_row_major(&m).is_none());
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let t = RigidTransform::from_rpy(DVec3::new(0.3, -1.2, 4.0), [0.2, -0.4, 1.1]);
        assert_transform_eq(&t.compose(&t.inverse()), &RigidTransform::IDENTITY);
        assert_transform_eq(&t.inverse().compose(&t), &RigidTransform::IDENTITY);
    }

    #[test]
    fn test_rpy_round_trip() {
        let rpy = [0.1, -0.7, 2.5];
        let t = RigidTransform::from_rpy(DVec3::ZERO, rpy);
        let back = t.rpy();
        for i in 0..3 {
            assert_relative_eq!(back[i], rpy[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rpy_gimbal_lock() {
        let t = RigidTransform::from_rpy(DVec3::ZERO, [0.0, std::f64::consts::FRAC_PI_2, 0.4]);
        let back = RigidTransform::from_rpy(DVec3::ZERO, t.rpy());
        assert_transform_eq(&t, &back);
    }

    #[test]
    fn test_relative_pose() {
        let parent = RigidTransform::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let child = RigidTransform::from_translation(DVec3::new(1.0, 2.0, 0.0));
        let local = parent.inverse().compose(&child);
        assert_eq!(local.translation, DVec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_pose_from_transform_scales_translation() {
        let t = RigidTransform::from_rpy(DVec3::new(100.0, 0.0, 0.0), [0.0, 0.0, 0.5]);
        let pose = Pose::from_transform(&t, 0.01);
        assert_eq!(pose.xyz, [1.0, 0.0, 0.0]);
        assert_relative_eq!(pose.rpy[2], 0.5);
        assert_transform_eq(
            &pose.to_transform(),
            &RigidTransform::from_rpy(DVec3::new(1.0, 0.0, 0.0), [0.0, 0.0, 0.5]),
        );
    }
}
