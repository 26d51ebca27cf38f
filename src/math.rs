// Math utilities for the lamp scene

use glam::{Mat4, Vec3};
use std::ops::Mul;

/// An affine 4x4 transformation.
///
/// Only built from scale, rotation and translation primitives, so it is always
/// invertible. Nodes hold these by value and replace them wholesale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(Mat4);

impl Transform {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    /// Create an identity transform
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translation(offset: Vec3) -> Self {
        Self(Mat4::from_translation(offset))
    }

    pub fn scale(factors: Vec3) -> Self {
        Self(Mat4::from_scale(factors))
    }

    pub fn uniform_scale(factor: f32) -> Self {
        Self::scale(Vec3::splat(factor))
    }

    /// Rotation about +X, in degrees.
    pub fn rotation_x(degrees: f32) -> Self {
        Self(Mat4::from_rotation_x(degrees.to_radians()))
    }

    /// Rotation about +Y, in degrees.
    pub fn rotation_y(degrees: f32) -> Self {
        Self(Mat4::from_rotation_y(degrees.to_radians()))
    }

    /// Rotation about +Z, in degrees.
    pub fn rotation_z(degrees: f32) -> Self {
        Self(Mat4::from_rotation_z(degrees.to_radians()))
    }

    /// Generate transformation matrix
    pub fn matrix(&self) -> Mat4 {
        self.0
    }

    /// The translation column, i.e. where the local origin lands.
    pub fn translation_vec(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    /// Approximate rotation vector read off the transformed +Y basis.
    ///
    /// This is the direction a light hanging off a rotated joint should point.
    /// Entries are clamped so scaled matrices stay finite.
    pub fn rotation_vec(&self) -> Vec3 {
        let up = self.0.y_axis;
        Vec3::new(
            -up.x.clamp(-1.0, 1.0).asin(),
            -up.y.clamp(-1.0, 1.0).asin(),
            -up.z.clamp(-1.0, 1.0).asin(),
        )
    }

    #[cfg(test)]
    pub fn abs_diff_eq(&self, other: Transform, max_abs_diff: f32) -> bool {
        self.0.abs_diff_eq(other.0, max_abs_diff)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform(self.0 * rhs.0)
    }
}

impl From<Mat4> for Transform {
    fn from(matrix: Mat4) -> Self {
        Self(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_is_neutral_for_composition() {
        let t = Transform::translation(Vec3::new(1.0, 2.0, 3.0)) * Transform::rotation_y(30.0);
        assert!((Transform::identity() * t).abs_diff_eq(t, 1e-6));
        assert!((t * Transform::identity()).abs_diff_eq(t, 1e-6));
    }

    #[test]
    fn translation_vec_reads_the_last_column() {
        let t = Transform::translation(Vec3::new(4.0, -1.0, 2.5))
            * Transform::rotation_z(45.0)
            * Transform::uniform_scale(3.0);
        assert!(t.translation_vec().abs_diff_eq(Vec3::new(4.0, -1.0, 2.5), 1e-6));
    }

    #[test]
    fn rotation_vec_of_identity_points_along_minus_half_pi_on_y() {
        let v = Transform::identity().rotation_vec();
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(v.y, -std::f32::consts::FRAC_PI_2, epsilon = 1e-6);
        assert_abs_diff_eq!(v.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn rotation_vec_follows_a_tilted_joint() {
        // Tilting +Y by 90 degrees about Z swings it onto -X.
        let v = Transform::rotation_z(90.0).rotation_vec();
        assert_abs_diff_eq!(v.x, std::f32::consts::FRAC_PI_2, epsilon = 1e-4);
        assert_abs_diff_eq!(v.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn rotation_vec_stays_finite_under_scale() {
        let v = Transform::uniform_scale(5.0).rotation_vec();
        assert!(v.is_finite());
    }
}
