//! Serde bundle documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tern_math::{Quat, Transform, Vec2, Vec3};

use super::{Bundle, BundleResult, MeshCaptureSink};
use crate::scene::{Camera, Light, LightKind, Mesh, MeshPart, Model, Node, Projection, Scene};

/// The contents of a bundle: meshes, scenes and loose nodes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BundleDocument {
    #[serde(default)]
    pub meshes: Vec<MeshData>,
    #[serde(default)]
    pub scenes: Vec<SceneData>,
    /// Nodes that belong to no scene but can be loaded by id
    #[serde(default)]
    pub nodes: Vec<NodeData>,
}

impl BundleDocument {
    pub fn from_json(content: &str) -> BundleResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn with_scene(mut self, scene: SceneData) -> Self {
        self.scenes.push(scene);
        self
    }

    pub fn with_node(mut self, node: NodeData) -> Self {
        self.nodes.push(node);
        self
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub id: String,
    pub positions: Vec<[f32; 3]>,
    /// One index list per mesh part
    pub parts: Vec<Vec<u32>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneData {
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<NodeData>,
}

impl SceneData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: NodeData) -> Self {
        self.nodes.push(node);
        self
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// Quaternion as `[x, y, z, w]`
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub camera: Option<CameraData>,
    #[serde(default)]
    pub light: Option<LightData>,
    /// Id of a mesh in the same document
    #[serde(default)]
    pub mesh: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeData>,
}

impl NodeData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_mesh(mut self, mesh: impl Into<String>) -> Self {
        self.mesh = Some(mesh.into());
        self
    }

    pub fn with_camera(mut self, camera: CameraData) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_child(mut self, child: NodeData) -> Self {
        self.children.push(child);
        self
    }

    fn find(&self, id: &str) -> Option<&NodeData> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CameraData {
    Perspective {
        field_of_view: f32,
        aspect_ratio: f32,
        near_plane: f32,
        far_plane: f32,
    },
    Orthographic {
        zoom: [f32; 2],
        aspect_ratio: f32,
        near_plane: f32,
        far_plane: f32,
    },
}

impl From<CameraData> for Camera {
    fn from(data: CameraData) -> Self {
        match data {
            CameraData::Perspective {
                field_of_view,
                aspect_ratio,
                near_plane,
                far_plane,
            } => Camera::perspective(field_of_view, aspect_ratio, near_plane, far_plane),
            CameraData::Orthographic {
                zoom,
                aspect_ratio,
                near_plane,
                far_plane,
            } => Camera {
                projection: Projection::Orthographic {
                    zoom: Vec2::from_array(zoom),
                },
                aspect_ratio,
                near_plane,
                far_plane,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LightData {
    Directional {
        color: [f32; 3],
    },
    Point {
        color: [f32; 3],
        range: f32,
    },
    Spot {
        color: [f32; 3],
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
    },
}

impl From<LightData> for Light {
    fn from(data: LightData) -> Self {
        let (kind, color) = match data {
            LightData::Directional { color } => (LightKind::Directional, color),
            LightData::Point { color, range } => (LightKind::Point { range }, color),
            LightData::Spot {
                color,
                range,
                inner_angle,
                outer_angle,
            } => (
                LightKind::Spot {
                    range,
                    inner_angle,
                    outer_angle,
                },
                color,
            ),
        };
        Light {
            kind,
            color: Vec3::from_array(color),
        }
    }
}

/// A [`Bundle`] over an in-memory [`BundleDocument`].
pub struct DocumentBundle {
    path: PathBuf,
    document: Arc<BundleDocument>,
    meshes: HashMap<String, Arc<Mesh>>,
}

impl DocumentBundle {
    pub fn new(path: &Path, document: Arc<BundleDocument>) -> Self {
        let meshes = document
            .meshes
            .iter()
            .map(|m| {
                let positions = m.positions.iter().copied().map(Vec3::from_array).collect();
                let parts = m.parts.iter().cloned().map(MeshPart::new).collect();
                (m.id.clone(), Arc::new(Mesh::new(m.id.clone(), positions, parts)))
            })
            .collect();
        Self {
            path: path.to_path_buf(),
            document,
            meshes,
        }
    }

    fn build_node(&self, data: &NodeData, capture: &mut dyn MeshCaptureSink) -> Node {
        let mut node = Node::new(data.id.clone());
        node.transform = Transform {
            translation: data.translation.map_or(Vec3::ZERO, Vec3::from_array),
            rotation: data.rotation.map_or(Quat::IDENTITY, Quat::from_array),
            scale: data.scale.map_or(Vec3::ONE, Vec3::from_array),
        };
        node.camera = data.camera.map(Camera::from);
        node.light = data.light.map(Light::from);

        if let Some(mesh_id) = &data.mesh {
            match self.meshes.get(mesh_id) {
                Some(mesh) => {
                    if capture.wants(&data.id) {
                        capture.capture_vertices(&data.id, mesh, mesh.vertex_bytes());
                        for part in &mesh.parts {
                            capture.capture_indices(&data.id, part.index_bytes());
                        }
                    }
                    node.model = Some(Model::new(Arc::clone(mesh)));
                }
                None => log::warn!(
                    "Node '{}' in bundle {} references missing mesh '{}'",
                    data.id,
                    self.path.display(),
                    mesh_id
                ),
            }
        }

        node.children = data
            .children
            .iter()
            .map(|c| self.build_node(c, capture))
            .collect();
        node
    }
}

impl Bundle for DocumentBundle {
    fn load_scene(&self, id: Option<&str>, capture: &mut dyn MeshCaptureSink) -> Option<Scene> {
        let data = match id {
            Some(id) => self.document.scenes.iter().find(|s| s.id == id),
            None => self.document.scenes.first(),
        };
        let Some(data) = data else {
            log::warn!(
                "Bundle {} has no scene '{}'",
                self.path.display(),
                id.unwrap_or("<first>")
            );
            return None;
        };

        let mut scene = Scene::new(data.id.clone());
        for node in &data.nodes {
            scene.add_node(self.build_node(node, capture));
        }
        Some(scene)
    }

    fn load_node(&self, id: &str, capture: &mut dyn MeshCaptureSink) -> Option<Node> {
        let data = self
            .document
            .nodes
            .iter()
            .chain(self.document.scenes.iter().flat_map(|s| s.nodes.iter()))
            .find_map(|n| n.find(id))?;
        Some(self.build_node(data, capture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::NoCapture;

    #[derive(Default)]
    struct Recorder {
        wanted: Vec<String>,
        vertices: Vec<(String, usize)>,
        indices: Vec<(String, usize)>,
    }

    impl MeshCaptureSink for Recorder {
        fn wants(&self, node_id: &str) -> bool {
            self.wanted.iter().any(|w| w == node_id)
        }

        fn capture_vertices(&mut self, node_id: &str, _mesh: &Arc<Mesh>, vertex_bytes: &[u8]) {
            self.vertices.push((node_id.to_string(), vertex_bytes.len()));
        }

        fn capture_indices(&mut self, node_id: &str, index_bytes: &[u8]) {
            self.indices.push((node_id.to_string(), index_bytes.len()));
        }
    }

    fn document() -> BundleDocument {
        BundleDocument::default()
            .with_mesh(MeshData {
                id: "tri".to_string(),
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                parts: vec![vec![0, 1, 2], vec![2, 1, 0]],
            })
            .with_scene(
                SceneData::new("main")
                    .with_node(NodeData::new("a").with_mesh("tri").with_child(NodeData::new("b")))
                    .with_node(NodeData::new("c").with_mesh("tri")),
            )
            .with_node(NodeData::new("loose").with_mesh("tri"))
    }

    fn bundle() -> DocumentBundle {
        DocumentBundle::new(Path::new("main.gpb"), Arc::new(document()))
    }

    #[test]
    fn test_load_scene() {
        let bundle = bundle();
        let scene = bundle.load_scene(None, &mut NoCapture).unwrap();
        assert_eq!(scene.id, "main");
        assert_eq!(scene.node_count(), 3);
        assert!(scene.find_node("a").unwrap().model.is_some());

        assert!(bundle.load_scene(Some("main"), &mut NoCapture).is_some());
        assert!(bundle.load_scene(Some("other"), &mut NoCapture).is_none());
    }

    #[test]
    fn test_load_node() {
        let bundle = bundle();
        assert_eq!(bundle.load_node("loose", &mut NoCapture).unwrap().id, "loose");
        assert_eq!(bundle.load_node("b", &mut NoCapture).unwrap().id, "b");
        assert!(bundle.load_node("missing", &mut NoCapture).is_none());
    }

    #[test]
    fn test_capture_only_wanted_nodes() {
        let bundle = bundle();
        let mut recorder = Recorder {
            wanted: vec!["c".to_string()],
            ..Default::default()
        };
        bundle.load_scene(None, &mut recorder).unwrap();
        assert_eq!(recorder.vertices, vec![("c".to_string(), 36)]);
        assert_eq!(
            recorder.indices,
            vec![("c".to_string(), 12), ("c".to_string(), 12)]
        );
    }

    #[test]
    fn test_json_document() {
        let json = r#"{
            "meshes": [],
            "scenes": [{
                "id": "main",
                "nodes": [{
                    "id": "cam",
                    "translation": [0, 1, 5],
                    "camera": {
                        "type": "perspective",
                        "field_of_view": 45,
                        "aspect_ratio": 1.5,
                        "near_plane": 0.1,
                        "far_plane": 100
                    }
                }]
            }]
        }"#;
        let document = BundleDocument::from_json(json).unwrap();
        let bundle = DocumentBundle::new(Path::new("main.gpb"), Arc::new(document));
        let scene = bundle.load_scene(None, &mut NoCapture).unwrap();
        let cam = scene.find_node("cam").unwrap();
        assert!(cam.camera.is_some());
        assert_eq!(cam.transform.translation, Vec3::new(0.0, 1.0, 5.0));
    }
}
