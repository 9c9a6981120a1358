use glam::{Mat4, Vec3};

/// Axis-aligned bounding box used to fit collision shapes to meshes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// Create an empty box (contains nothing).
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Create a box from two corner points in any order.
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box containing every point.
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Vec3>,
    {
        points.into_iter().fold(Self::empty(), |mut acc, p| {
            acc.min = acc.min.min(*p);
            acc.max = acc.max.max(*p);
            acc
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Full edge lengths along each axis (zero for an empty box).
    pub fn extents(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Bounding box of all 8 transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let moved: Vec<Vec3> = corners.iter().map(|c| matrix.transform_point3(*c)).collect();
        Self::from_points(&moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let points = [
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::ZERO,
        ];
        let b = BoundingBox::from_points(&points);

        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(b.max, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(b.extents(), Vec3::new(5.0, 7.0, 9.0));
    }

    #[test]
    fn test_empty() {
        let b = BoundingBox::from_points(&Vec::<Vec3>::new());
        assert!(b.is_empty());
        assert_eq!(b.extents(), Vec3::ZERO);
        assert_eq!(b.center(), Vec3::ZERO);
    }

    #[test]
    fn test_transformed_scale() {
        let b = BoundingBox::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0));
        let scaled = b.transformed(&Mat4::from_scale(Vec3::new(2.0, 1.0, 3.0)));
        assert!((scaled.extents() - Vec3::new(4.0, 2.0, 6.0)).length() < 0.001);
    }
}
