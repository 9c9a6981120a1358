// Local node transforms.
//
// Scale, rotation and translation are kept separate so the scene loader can
// apply `translate`, `rotate` and `scale` properties incrementally, the same
// way the engine's node API does.

use glam::{Mat4, Quat, Vec3};

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,

    /// Rotation (as quaternion)
    pub rotation: Quat,

    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a new transform from a 4x4 matrix.
    ///
    /// Decomposes the matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Offset the translation.
    pub fn translate(&mut self, offset: Vec3) {
        self.translation += offset;
    }

    /// Post-multiply the current rotation.
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = (self.rotation * rotation).normalize();
    }

    /// Multiply the current scale component-wise.
    pub fn scale_by(&mut self, scale: Vec3) {
        self.scale *= scale;
    }
}

/// Build a rotation from an axis and an angle in degrees.
///
/// A zero-length axis yields the identity rotation.
pub fn quat_from_axis_angle_degrees(axis: Vec3, degrees: f32) -> Quat {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, degrees.to_radians()),
        None => Quat::IDENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let recovered = Transform::from_matrix(transform.to_matrix());

        assert!((recovered.translation - transform.translation).length() < 0.001);
        assert!((recovered.scale - transform.scale).length() < 0.001);
    }

    #[test]
    fn test_incremental_ops() {
        let mut t = Transform::default();
        t.translate(Vec3::new(1.0, 0.0, 0.0));
        t.translate(Vec3::new(0.0, 2.0, 0.0));
        t.scale_by(Vec3::splat(2.0));
        t.scale_by(Vec3::new(1.0, 3.0, 1.0));

        assert_eq!(t.translation, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(t.scale, Vec3::new(2.0, 6.0, 2.0));
    }

    #[test]
    fn test_axis_angle_degrees() {
        let q = quat_from_axis_angle_degrees(Vec3::new(0.0, 0.0, 2.0), 90.0);
        let v = q * Vec3::X;
        assert!((v - Vec3::Y).length() < 0.001);

        assert_eq!(quat_from_axis_angle_degrees(Vec3::ZERO, 45.0), Quat::IDENTITY);
    }
}
