//! A bookkeeping [`PhysicsWorld`].
//!
//! Shapes are fitted the way a physics engine would fit them (from the
//! model bounds and the node's world scale) and every call is recorded so
//! that callers can inspect what was built.

use std::collections::HashMap;

use tern_math::{Mat4, Vec3};

use super::{
    ConstraintFrames, ConstraintHandle, ConstraintSetting, ConstraintType, PhysicsWorld,
    RigidBodyDesc, RigidBodyHandle, RigidBodyRequest, ShapeType,
};

/// A fitted collision shape.
#[derive(Clone, Debug, PartialEq)]
pub enum CollisionShape {
    Box { extents: Vec3, center: Vec3 },
    Sphere { radius: f32, center: Vec3 },
    Capsule { radius: f32, height: f32, center: Vec3 },
    /// Triangle mesh in node-scaled units
    Mesh { vertices: Vec<Vec3>, indices: Vec<u32> },
    Heightfield { image: String },
}

#[derive(Clone, Debug)]
pub struct RigidBodyRecord {
    pub handle: RigidBodyHandle,
    pub node_id: String,
    /// Id of the mesh the shape was fitted to
    pub mesh_id: String,
    pub desc: RigidBodyDesc,
    pub world_transform: Mat4,
    pub shape: CollisionShape,
}

#[derive(Clone, Debug)]
pub struct ConstraintRecord {
    pub handle: ConstraintHandle,
    pub kind: ConstraintType,
    pub body_a: RigidBodyHandle,
    pub body_b: Option<RigidBodyHandle>,
    pub frames: ConstraintFrames,
    /// Settings in the order they were applied
    pub settings: Vec<ConstraintSetting>,
}

/// Records rigid bodies and constraints without simulating them.
#[derive(Debug, Default)]
pub struct PhysicsRegistry {
    gravity: Option<Vec3>,
    bodies: Vec<RigidBodyRecord>,
    constraints: Vec<ConstraintRecord>,
    by_node: HashMap<String, RigidBodyHandle>,
}

impl PhysicsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gravity(&self) -> Option<Vec3> {
        self.gravity
    }

    pub fn rigid_bodies(&self) -> &[RigidBodyRecord] {
        &self.bodies
    }

    pub fn rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBodyRecord> {
        self.bodies.get(handle.0 as usize)
    }

    /// The most recent body created for `node_id`.
    pub fn rigid_body_for_node(&self, node_id: &str) -> Option<&RigidBodyRecord> {
        self.by_node.get(node_id).and_then(|h| self.rigid_body(*h))
    }

    pub fn constraints(&self) -> &[ConstraintRecord] {
        &self.constraints
    }

    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&ConstraintRecord> {
        self.constraints.get(handle.0 as usize)
    }

    fn fit_shape(&self, request: &RigidBodyRequest<'_>) -> Option<CollisionShape> {
        let desc = request.desc;
        let (scale, _, _) = request.world_transform.to_scale_rotation_translation();
        let scale = scale.abs();
        let bounds = request.model.mesh.bounds;
        let fitted_extents = bounds.extents() * scale;

        let center = |fitted: Vec3| match desc.center {
            Some(c) if desc.center_absolute => c,
            Some(c) => c * fitted,
            None => bounds.center() * scale,
        };

        let shape = match desc.shape {
            ShapeType::Box => {
                let extents = desc.extents.map_or(fitted_extents, |e| e * scale);
                CollisionShape::Box {
                    extents,
                    center: center(extents),
                }
            }
            ShapeType::Sphere => {
                let radius = match desc.radius {
                    Some(r) => r * scale.max_element(),
                    None => fitted_extents.max_element() * 0.5,
                };
                CollisionShape::Sphere {
                    radius,
                    center: center(Vec3::splat(radius * 2.0)),
                }
            }
            ShapeType::Capsule => {
                let radius = match desc.radius {
                    Some(r) => r * scale.x.max(scale.z),
                    None => fitted_extents.x.max(fitted_extents.z) * 0.5,
                };
                let height = match desc.height {
                    Some(h) => h * scale.y,
                    None => fitted_extents.y,
                };
                CollisionShape::Capsule {
                    radius,
                    height,
                    center: center(Vec3::new(radius * 2.0, height, radius * 2.0)),
                }
            }
            ShapeType::Mesh => {
                let Some(data) = request.mesh_data else {
                    log::warn!(
                        "Rigid body '{}' on node '{}' is a mesh shape but no mesh data was captured",
                        desc.id,
                        request.node_id
                    );
                    return None;
                };
                let floats: Vec<f32> = bytemuck::pod_collect_to_vec(data.vertex_data());
                let vertices = floats
                    .chunks_exact(3)
                    .map(|v| Vec3::new(v[0], v[1], v[2]) * scale)
                    .collect();
                let indices = data
                    .index_data()
                    .iter()
                    .flat_map(|part| bytemuck::pod_collect_to_vec::<u8, u32>(part))
                    .collect();
                CollisionShape::Mesh { vertices, indices }
            }
            ShapeType::Heightfield => {
                let Some(image) = &desc.image else {
                    log::warn!(
                        "Rigid body '{}' on node '{}' is a heightfield without an image",
                        desc.id,
                        request.node_id
                    );
                    return None;
                };
                CollisionShape::Heightfield {
                    image: image.clone(),
                }
            }
        };
        Some(shape)
    }
}

impl PhysicsWorld for PhysicsRegistry {
    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = Some(gravity);
    }

    fn create_rigid_body(&mut self, request: RigidBodyRequest<'_>) -> Option<RigidBodyHandle> {
        let shape = self.fit_shape(&request)?;
        let handle = RigidBodyHandle(self.bodies.len() as u32);
        log::debug!(
            "Created {} rigid body '{}' for node '{}'",
            request.desc.shape,
            request.desc.id,
            request.node_id
        );
        self.bodies.push(RigidBodyRecord {
            handle,
            node_id: request.node_id.to_string(),
            mesh_id: request.model.mesh.id.clone(),
            desc: request.desc.clone(),
            world_transform: request.world_transform,
            shape,
        });
        self.by_node.insert(request.node_id.to_string(), handle);
        Some(handle)
    }

    fn create_constraint(
        &mut self,
        kind: ConstraintType,
        a: RigidBodyHandle,
        b: Option<RigidBodyHandle>,
        frames: &ConstraintFrames,
    ) -> Option<ConstraintHandle> {
        if self.rigid_body(a).is_none() || b.is_some_and(|b| self.rigid_body(b).is_none()) {
            log::warn!("{} constraint references an unknown rigid body", kind);
            return None;
        }
        if kind.requires_body_b() && b.is_none() {
            log::warn!("{} constraint requires two rigid bodies", kind);
            return None;
        }

        let handle = ConstraintHandle(self.constraints.len() as u32);
        self.constraints.push(ConstraintRecord {
            handle,
            kind,
            body_a: a,
            body_b: b,
            frames: *frames,
            settings: Vec::new(),
        });
        Some(handle)
    }

    fn configure_constraint(&mut self, handle: ConstraintHandle, setting: ConstraintSetting) {
        let Some(record) = self.constraints.get_mut(handle.0 as usize) else {
            log::warn!("Ignoring setting for unknown constraint {:?}", handle);
            return;
        };
        if !setting.applies_to(record.kind) {
            log::warn!("Ignoring {:?} on {} constraint", setting, record.kind);
            return;
        }
        record.settings.push(setting);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::properties::Properties;
    use crate::scene::{Mesh, MeshPart, Model};

    fn cube_model() -> Model {
        let positions = vec![Vec3::splat(-1.0), Vec3::splat(1.0)];
        Model::new(Arc::new(Mesh::new("cube", positions, vec![MeshPart::new(vec![0, 1, 0])])))
    }

    fn desc(shape: &str) -> RigidBodyDesc {
        RigidBodyDesc::from_properties(&Properties::new("rigidBody", "body").with("type", shape))
            .unwrap()
    }

    fn create(
        world: &mut PhysicsRegistry,
        node_id: &str,
        desc: &RigidBodyDesc,
        world_transform: Mat4,
    ) -> Option<RigidBodyHandle> {
        let model = cube_model();
        world.create_rigid_body(RigidBodyRequest {
            node_id,
            world_transform,
            model: &model,
            desc,
            mesh_data: None,
        })
    }

    #[test]
    fn test_box_fitted_to_scaled_bounds() {
        let mut world = PhysicsRegistry::new();
        let scale = Mat4::from_scale(Vec3::new(2.0, 1.0, 3.0));
        let handle = create(&mut world, "crate", &desc("BOX"), scale).unwrap();

        let record = world.rigid_body(handle).unwrap();
        assert_eq!(
            record.shape,
            CollisionShape::Box {
                extents: Vec3::new(4.0, 2.0, 6.0),
                center: Vec3::ZERO
            }
        );
        assert_eq!(world.rigid_body_for_node("crate").unwrap().handle, handle);
    }

    #[test]
    fn test_sphere_and_capsule() {
        let mut world = PhysicsRegistry::new();
        let h = create(&mut world, "ball", &desc("SPHERE"), Mat4::IDENTITY).unwrap();
        assert!(matches!(
            world.rigid_body(h).unwrap().shape,
            CollisionShape::Sphere { radius, .. } if radius == 1.0
        ));

        let h = create(&mut world, "pill", &desc("CAPSULE"), Mat4::IDENTITY).unwrap();
        assert!(matches!(
            world.rigid_body(h).unwrap().shape,
            CollisionShape::Capsule { radius, height, .. } if radius == 1.0 && height == 2.0
        ));
    }

    #[test]
    fn test_mesh_and_heightfield_need_data() {
        let mut world = PhysicsRegistry::new();
        assert!(create(&mut world, "m", &desc("MESH"), Mat4::IDENTITY).is_none());
        assert!(create(&mut world, "h", &desc("HEIGHTFIELD"), Mat4::IDENTITY).is_none());

        let mut terrain = desc("HEIGHTFIELD");
        terrain.image = Some("res/height.png".to_string());
        assert!(create(&mut world, "h", &terrain, Mat4::IDENTITY).is_some());
        assert_eq!(world.rigid_bodies().len(), 1);
    }

    #[test]
    fn test_constraints_and_settings() {
        let mut world = PhysicsRegistry::new();
        let a = create(&mut world, "a", &desc("BOX"), Mat4::IDENTITY).unwrap();
        let b = create(&mut world, "b", &desc("BOX"), Mat4::IDENTITY).unwrap();

        assert!(world
            .create_constraint(ConstraintType::Spring, a, None, &ConstraintFrames::Auto)
            .is_none());
        assert!(world
            .create_constraint(
                ConstraintType::Fixed,
                a,
                Some(RigidBodyHandle(99)),
                &ConstraintFrames::Auto
            )
            .is_none());

        let hinge = world
            .create_constraint(ConstraintType::Hinge, a, Some(b), &ConstraintFrames::Auto)
            .unwrap();
        world.configure_constraint(
            hinge,
            ConstraintSetting::HingeLimits {
                min_angle: -1.0,
                max_angle: 1.0,
                bounciness: None,
            },
        );
        world.configure_constraint(hinge, ConstraintSetting::LinearLowerLimit(Vec3::ZERO));
        world.configure_constraint(hinge, ConstraintSetting::BreakingImpulse(10.0));

        let record = world.constraint(hinge).unwrap();
        assert_eq!(record.settings.len(), 2);
        assert_eq!(record.body_b, Some(b));
    }
}
