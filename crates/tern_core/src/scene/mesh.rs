//! Mesh geometry and models.
//!
//! Bundles hand meshes over already split into parts (one index list per
//! material slot). The loader never uploads anything; it only needs the
//! positions, the parts and the bounds to fit collision shapes.

use std::sync::Arc;

use tern_math::{BoundingBox, Vec3};

use super::components::Material;

/// One index list of a mesh (every 3 indices form a triangle).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPart {
    pub indices: Vec<u32>,
}

impl MeshPart {
    pub fn new(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw index bytes, as captured for mesh rigid bodies.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Vertex positions plus one or more index parts.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Mesh identifier inside its bundle
    pub id: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Index parts
    pub parts: Vec<MeshPart>,

    /// Axis-aligned bounding box
    pub bounds: BoundingBox,
}

impl Mesh {
    pub fn new(id: impl Into<String>, positions: Vec<Vec3>, parts: Vec<MeshPart>) -> Self {
        let bounds = BoundingBox::from_points(&positions);
        Self {
            id: id.into(),
            positions,
            parts,
            bounds,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(MeshPart::triangle_count).sum()
    }

    /// Raw vertex bytes, as captured for mesh rigid bodies.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

/// A mesh instance on a node, with an optional material.
#[derive(Clone, Debug)]
pub struct Model {
    pub mesh: Arc<Mesh>,
    pub material: Option<Arc<Material>>,
}

impl Model {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            material: None,
        }
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = Some(Arc::new(material));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        Mesh::new(
            "quad",
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![MeshPart::new(vec![0, 1, 2]), MeshPart::new(vec![0, 2, 3])],
        )
    }

    #[test]
    fn test_counts_and_bounds() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.part_count(), 2);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.bounds.extents(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_raw_bytes() {
        let mesh = quad();
        assert_eq!(mesh.vertex_bytes().len(), 4 * 3 * 4);
        assert_eq!(mesh.parts[0].index_bytes().len(), 3 * 4);
    }
}
