// Re-export glam for convenience
pub use glam::*;

// Tern math types
mod bounds;
mod transform;
pub use bounds::BoundingBox;
pub use transform::{quat_from_axis_angle_degrees, Transform};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_quat_reexport() {
        let q = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let v = q * Vec3::X;
        assert!((v - Vec3::NEG_Z).length() < 0.001);
    }
}
