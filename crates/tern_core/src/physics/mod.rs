//! Physics collaborator.
//!
//! The scene loader never simulates anything. It asks a [`PhysicsWorld`] to
//! create rigid bodies and constraints and keeps the returned handles on
//! nodes and scenes. [`PhysicsRegistry`] is a world that only records what
//! it was asked to build.

mod constraint;
mod registry;
mod rigid_body;

pub use constraint::*;
pub use registry::*;
pub use rigid_body::*;

use tern_math::{Mat4, Vec3};

use crate::loader::MeshRigidBodyData;
use crate::scene::Model;

/// Opaque rigid body reference handed out by a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub u32);

/// Opaque constraint reference handed out by a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintHandle(pub u32);

/// Everything needed to build one rigid body.
#[derive(Clone, Copy, Debug)]
pub struct RigidBodyRequest<'a> {
    /// Node the body is attached to
    pub node_id: &'a str,
    /// World transform of that node after all transform properties
    pub world_transform: Mat4,
    /// Model the shape is fitted to (the node's own or an override)
    pub model: &'a Model,
    pub desc: &'a RigidBodyDesc,
    /// Raw geometry, present only for mesh shapes that were captured
    pub mesh_data: Option<&'a MeshRigidBodyData>,
}

/// Factory entry points of a physics engine.
pub trait PhysicsWorld {
    fn set_gravity(&mut self, gravity: Vec3);

    fn create_rigid_body(&mut self, request: RigidBodyRequest<'_>) -> Option<RigidBodyHandle>;

    /// Create a constraint between `a` and optionally `b`.
    fn create_constraint(
        &mut self,
        kind: ConstraintType,
        a: RigidBodyHandle,
        b: Option<RigidBodyHandle>,
        frames: &ConstraintFrames,
    ) -> Option<ConstraintHandle>;

    fn configure_constraint(&mut self, handle: ConstraintHandle, setting: ConstraintSetting);
}
