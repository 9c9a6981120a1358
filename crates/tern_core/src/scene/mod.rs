//! Scene graph.
//!
//! A [`Scene`] owns a forest of [`Node`]s. Nodes carry a local
//! [`Transform`] and optional components; node ids are unique within a
//! scene once loading has finished.

mod components;
mod mesh;

pub use components::*;
pub use mesh::*;

use tern_math::{Mat4, Transform};

use crate::physics::{ConstraintHandle, RigidBodyHandle};

/// A node in the scene graph.
#[derive(Clone, Debug, Default)]
pub struct Node {
    pub id: String,
    pub transform: Transform,
    pub children: Vec<Node>,
    pub camera: Option<Camera>,
    pub light: Option<Light>,
    pub model: Option<Model>,
    pub audio_source: Option<AudioSource>,
    pub particle_emitter: Option<ParticleEmitter>,
    pub rigid_body: Option<RigidBodyHandle>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Find this node or a descendant by id (depth first).
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

/// A loaded scene.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub id: String,
    nodes: Vec<Node>,
    active_camera: Option<String>,
    /// Constraints created for this scene, in creation order
    pub constraints: Vec<ConstraintHandle>,
}

impl Scene {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Append a root node.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn roots(&self) -> &[Node] {
        &self.nodes
    }

    /// Every node, depth first in declaration order.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            stack: self.nodes.iter().rev().collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(Node::subtree_len).sum()
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find_map(|n| n.find(id))
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find_map(|n| n.find_mut(id))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Composed transform of a node, parents first.
    pub fn world_transform(&self, id: &str) -> Option<Mat4> {
        world_transform_in(&self.nodes, id, Mat4::IDENTITY)
    }

    /// Make the node `id` the active camera.
    ///
    /// Returns false (and leaves the current camera alone) when there is no
    /// such node or it has no camera.
    pub fn set_active_camera(&mut self, id: &str) -> bool {
        match self.find_node(id) {
            Some(node) if node.camera.is_some() => {
                self.active_camera = Some(id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn active_camera(&self) -> Option<&str> {
        self.active_camera.as_deref()
    }

    pub fn active_camera_node(&self) -> Option<&Node> {
        self.find_node(self.active_camera.as_deref()?)
    }
}

fn world_transform_in(nodes: &[Node], id: &str, parent: Mat4) -> Option<Mat4> {
    nodes.iter().find_map(|node| {
        let world = parent * node.transform.to_matrix();
        if node.id == id {
            Some(world)
        } else {
            world_transform_in(&node.children, id, world)
        }
    })
}

/// Depth-first node iterator returned by [`Scene::nodes`].
pub struct Nodes<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_math::Vec3;

    fn sample() -> Scene {
        let mut scene = Scene::new("level");
        scene.add_node(
            Node::new("root")
                .with_transform(Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)))
                .with_child(
                    Node::new("arm")
                        .with_transform(Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)))
                        .with_child(Node::new("hand")),
                ),
        );
        scene.add_node(Node::new("camera").with_camera(Camera::perspective(45.0, 1.5, 0.1, 100.0)));
        scene
    }

    #[test]
    fn test_iteration_order() {
        let scene = sample();
        let ids: Vec<_> = scene.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "arm", "hand", "camera"]);
        assert_eq!(scene.node_count(), 4);
    }

    #[test]
    fn test_find_and_world_transform() {
        let mut scene = sample();
        assert!(scene.contains_node("hand"));
        assert!(!scene.contains_node("foot"));

        let world = scene.world_transform("hand").unwrap();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));

        scene.find_node_mut("hand").unwrap().transform.translate(Vec3::Z);
        let world = scene.world_transform("hand").unwrap();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_active_camera() {
        let mut scene = sample();
        assert!(!scene.set_active_camera("root"));
        assert!(!scene.set_active_camera("missing"));
        assert_eq!(scene.active_camera(), None);

        assert!(scene.set_active_camera("camera"));
        assert_eq!(scene.active_camera_node().unwrap().id, "camera");
    }
}
