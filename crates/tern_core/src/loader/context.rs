//! Deferred reference tables.
//!
//! One [`LoadContext`] lives for exactly one load. The first pass over the
//! scene namespace only records what has to be resolved later and which
//! files are needed to resolve it; nothing is looked up yet.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::LoadReport;
use crate::bundle::{Bundle, BundleError, BundleLoader};
use crate::physics::ShapeType;
use crate::properties::{Properties, PropertiesSource};
use crate::url::{is_bundle_file, split_url, UrlRef};

/// What a pending node property assigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodePropertyKind {
    Url,
    Audio,
    Material,
    Particle,
    RigidBody,
    Translate,
    Rotate,
    Scale,
}

const NODE_PROPERTY_NAMES: [(&str, NodePropertyKind); 8] = [
    ("url", NodePropertyKind::Url),
    ("audio", NodePropertyKind::Audio),
    ("material", NodePropertyKind::Material),
    ("particle", NodePropertyKind::Particle),
    ("rigidbody", NodePropertyKind::RigidBody),
    ("translate", NodePropertyKind::Translate),
    ("rotate", NodePropertyKind::Rotate),
    ("scale", NodePropertyKind::Scale),
];

/// Read by the rigid body pass directly from the node namespace.
pub(crate) const RIGID_BODY_MODEL: &str = "rigidbodymodel";

impl NodePropertyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        NODE_PROPERTY_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn name(self) -> &'static str {
        NODE_PROPERTY_NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("", |(n, _)| n)
    }

    /// The value is a `file#id` reference rather than a vector.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            NodePropertyKind::Url
                | NodePropertyKind::Audio
                | NodePropertyKind::Material
                | NodePropertyKind::Particle
                | NodePropertyKind::RigidBody
        )
    }
}

/// One pending assignment to a node of the scene being built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneNodeProperty {
    pub kind: NodePropertyKind,
    /// Final id of the target node
    pub node_id: String,
    /// Referenced file, empty for scene-local references
    pub file: String,
    /// Namespace or node id inside `file`, empty for "the first one"
    pub id: String,
}

/// One pending animation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneAnimation {
    pub animation_id: String,
    pub target_id: String,
    pub file: String,
    pub id: String,
}

/// Why a referenced properties namespace could not be found.
#[derive(Error, Debug)]
pub(crate) enum SourceError {
    #[error("file '{0}' could not be loaded")]
    FileNotLoaded(String),

    #[error("no namespace '{id}' in '{file}'")]
    NamespaceMissing { file: String, id: String },

    #[error("file '{0}' is empty")]
    Empty(String),

    #[error("no namespace '{0}' in the scene file")]
    LocalMissing(String),
}

/// The tables of one in-progress load.
#[derive(Default)]
pub(crate) struct LoadContext {
    pub base_dir: PathBuf,
    pub bundle_extension: String,
    /// Referenced properties files; `None` until loaded, or when loading failed
    pub files: BTreeMap<String, Option<Properties>>,
    pub node_properties: Vec<SceneNodeProperty>,
    pub animations: Vec<SceneAnimation>,
    /// Final node id -> raw id of the node it is stitched from
    pub raw_ids: HashMap<String, String>,
    /// Raw id -> final id, for URL entries without a file
    pub local_renames: HashMap<String, String>,
}

impl LoadContext {
    pub fn new(base_dir: PathBuf, bundle_extension: &str) -> Self {
        Self {
            base_dir,
            bundle_extension: bundle_extension.to_string(),
            ..Default::default()
        }
    }

    /// Walk the scene namespace once and record everything to resolve later.
    pub fn build_reference_tables(&mut self, scene_ns: &Properties, report: &mut LoadReport) {
        for ns in scene_ns.namespaces() {
            match ns.namespace_name() {
                "node" => self.add_node_properties(ns, report),
                "animations" => self.add_animations(ns, report),
                // Constraints need the finished node graph.
                "physics" => {}
                other => skip!(
                    report,
                    "Unsupported namespace '{}' in scene '{}'",
                    other,
                    scene_ns.id()
                ),
            }
        }
        log::debug!(
            "Reference tables: {} node properties, {} animations, {} files",
            self.node_properties.len(),
            self.animations.len(),
            self.files.len()
        );
    }

    fn add_node_properties(&mut self, ns: &Properties, report: &mut LoadReport) {
        let node_id = ns.id();
        if node_id.is_empty() {
            skip!(report, "Skipping node namespace without an id");
            return;
        }

        for (name, value) in ns.properties() {
            let Some(kind) = NodePropertyKind::from_name(name) else {
                if name != RIGID_BODY_MODEL {
                    skip!(
                        report,
                        "Unsupported node property '{}' on node '{}'",
                        name,
                        node_id
                    );
                }
                continue;
            };

            if !kind.is_reference() {
                self.node_properties.push(SceneNodeProperty {
                    kind,
                    node_id: node_id.to_string(),
                    file: String::new(),
                    id: String::new(),
                });
                continue;
            }

            let url = UrlRef::parse(value);
            if kind == NodePropertyKind::Url {
                if url.id.is_empty() {
                    skip!(
                        report,
                        "Node '{}' has url '{}' without a node id",
                        node_id,
                        value
                    );
                    continue;
                }
                self.raw_ids
                    .entry(node_id.to_string())
                    .or_insert_with(|| url.id.to_string());
                if url.is_local() {
                    self.local_renames
                        .entry(url.id.to_string())
                        .or_insert_with(|| node_id.to_string());
                }
            }
            self.register_file(url.file);
            self.node_properties.push(SceneNodeProperty {
                kind,
                node_id: node_id.to_string(),
                file: url.file.to_string(),
                id: url.id.to_string(),
            });
        }
    }

    fn add_animations(&mut self, ns: &Properties, report: &mut LoadReport) {
        for animation in ns.namespaces() {
            if animation.namespace_name() != "animation" {
                skip!(
                    report,
                    "Unsupported namespace '{}' in animations",
                    animation.namespace_name()
                );
                continue;
            }
            let animation_id = animation.id();
            let (Some(url), Some(target)) = (animation.get_str("url"), animation.get_str("target"))
            else {
                skip!(
                    report,
                    "Animation '{}' needs an id, a url and a target",
                    animation_id
                );
                continue;
            };
            if animation_id.is_empty() {
                skip!(report, "Animation with url '{}' has no id", url);
                continue;
            }

            let (file, id) = split_url(url);
            self.register_file(file);
            self.animations.push(SceneAnimation {
                animation_id: animation_id.to_string(),
                target_id: target.to_string(),
                file: file.to_string(),
                id: id.to_string(),
            });
        }
    }

    fn register_file(&mut self, file: &str) {
        if file.is_empty() || is_bundle_file(file, &self.bundle_extension) {
            return;
        }
        self.files.entry(file.to_string()).or_insert(None);
    }

    /// Parse every registered file that has not been loaded yet.
    pub fn load_auxiliary_files(&mut self, source: &dyn PropertiesSource, report: &mut LoadReport) {
        let base_dir = &self.base_dir;
        for (file, slot) in self.files.iter_mut().filter(|(_, slot)| slot.is_none()) {
            let path = resolve_path(base_dir, file);
            match source.load_properties(&path) {
                Ok(props) => *slot = Some(props),
                Err(e) => skip!(report, "Failed to load '{}': {}", path.display(), e),
            }
        }
    }

    /// Remove the URL entries from the pending list, keeping their order.
    pub fn take_url_properties(&mut self) -> Vec<SceneNodeProperty> {
        let (urls, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.node_properties)
            .into_iter()
            .partition(|p| p.kind == NodePropertyKind::Url);
        self.node_properties = rest;
        urls
    }

    /// Raw id of the node that ends up as `final_id`.
    pub fn raw_id<'a>(&'a self, final_id: &'a str) -> &'a str {
        self.raw_ids.get(final_id).map_or(final_id, String::as_str)
    }

    /// Raw ids of every node whose mesh data must be kept for a mesh rigid body.
    pub fn mesh_rigid_body_set(&self, scene_root: &Properties, scene_ns: &Properties) -> HashSet<String> {
        let mut set = HashSet::new();
        for prop in self
            .node_properties
            .iter()
            .filter(|p| p.kind == NodePropertyKind::RigidBody)
        {
            let Ok(source) = self.source(scene_root, &prop.file, &prop.id) else {
                continue;
            };
            let shape = source.get_str("type").and_then(|t| t.parse::<ShapeType>().ok());
            if shape != Some(ShapeType::Mesh) {
                continue;
            }
            let capture_node = scene_ns
                .child("node", &prop.node_id)
                .and_then(|n| n.get_str(RIGID_BODY_MODEL))
                .unwrap_or(&prop.node_id);
            set.insert(self.raw_id(capture_node).to_string());
        }
        set
    }

    /// Find the properties namespace a reference points at.
    ///
    /// References without a file name a top-level namespace of the scene
    /// file itself; without an id they take the first namespace of the file.
    pub fn source<'p>(
        &'p self,
        scene_root: &'p Properties,
        file: &str,
        id: &str,
    ) -> Result<&'p Properties, SourceError> {
        if file.is_empty() {
            return scene_root
                .namespaces()
                .find(|ns| ns.id() == id && ns.namespace_name() != "scene")
                .ok_or_else(|| SourceError::LocalMissing(id.to_string()));
        }

        let props = self
            .files
            .get(file)
            .and_then(Option::as_ref)
            .ok_or_else(|| SourceError::FileNotLoaded(file.to_string()))?;
        if id.is_empty() {
            props
                .first_namespace()
                .ok_or_else(|| SourceError::Empty(file.to_string()))
        } else {
            props.namespace(id).ok_or_else(|| SourceError::NamespaceMissing {
                file: file.to_string(),
                id: id.to_string(),
            })
        }
    }
}

/// Resolve a referenced file against the load's base directory.
pub(crate) fn resolve_path(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Bundles opened during one load, keyed by the file string that named them.
pub(crate) struct BundleCache<'l> {
    loader: &'l dyn BundleLoader,
    base_dir: PathBuf,
    opened: HashMap<String, Result<Box<dyn Bundle>, BundleError>>,
}

impl<'l> BundleCache<'l> {
    pub fn new(loader: &'l dyn BundleLoader, base_dir: &Path) -> Self {
        Self {
            loader,
            base_dir: base_dir.to_path_buf(),
            opened: HashMap::new(),
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        resolve_path(&self.base_dir, file)
    }

    /// Open `file` once; later calls return the cached bundle or error.
    pub fn get(&mut self, file: &str) -> Result<&dyn Bundle, &BundleError> {
        let loader = self.loader;
        let path = self.path(file);
        self.opened
            .entry(file.to_string())
            .or_insert_with(|| loader.open(&path))
            .as_ref()
            .map(|bundle| &**bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::MemoryFiles;

    fn scene_file() -> Properties {
        Properties::parse(
            r#"
scene level
{
    path = res/level.gpb
    activeCamera = camera

    node box
    {
        url = crate
        material = res/box.material#red
        rigidbody = res/box.physics
        scale = 2, 2, 2
        glow = true
    }

    node extra
    {
        url = res/props.gpb#barrel
        audio = boom
    }

    node
    {
        translate = 1, 0, 0
    }

    animations
    {
        animation spin
        {
            url = res/box.animation
            target = box
        }
        animation broken
        {
            target = box
        }
    }

    physics
    {
        gravity = 0, -9.8, 0
    }

    lights
    {
    }
}

audio boom
{
    path = res/boom.wav
}
"#,
        )
        .unwrap()
    }

    fn tables() -> (LoadContext, Properties, LoadReport) {
        let root = scene_file();
        let mut ctx = LoadContext::new(PathBuf::new(), "gpb");
        let mut report = LoadReport::default();
        ctx.build_reference_tables(root.child_named("scene").unwrap(), &mut report);
        (ctx, root, report)
    }

    #[test]
    fn test_classifies_node_properties() {
        let (ctx, _, _) = tables();
        let kinds: Vec<_> = ctx
            .node_properties
            .iter()
            .map(|p| (p.kind, p.node_id.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (NodePropertyKind::Url, "box"),
                (NodePropertyKind::Material, "box"),
                (NodePropertyKind::RigidBody, "box"),
                (NodePropertyKind::Scale, "box"),
                (NodePropertyKind::Url, "extra"),
                (NodePropertyKind::Audio, "extra"),
            ]
        );
        assert_eq!(ctx.node_properties[1].file, "res/box.material");
        assert_eq!(ctx.node_properties[1].id, "red");
        assert_eq!(ctx.node_properties[5].file, "");
        assert_eq!(ctx.node_properties[5].id, "boom");
    }

    #[test]
    fn test_registers_non_bundle_files() {
        let (ctx, _, _) = tables();
        let files: Vec<_> = ctx.files.keys().map(String::as_str).collect();
        assert_eq!(
            files,
            vec!["res/box.animation", "res/box.material", "res/box.physics"]
        );
        assert!(ctx.files.values().all(Option::is_none));
    }

    #[test]
    fn test_rename_maps() {
        let (ctx, _, _) = tables();
        assert_eq!(ctx.raw_id("box"), "crate");
        assert_eq!(ctx.raw_id("extra"), "barrel");
        assert_eq!(ctx.raw_id("other"), "other");
        assert_eq!(ctx.local_renames.get("crate").map(String::as_str), Some("box"));
        assert!(!ctx.local_renames.contains_key("barrel"));
    }

    #[test]
    fn test_animations_and_warnings() {
        let (ctx, _, report) = tables();
        assert_eq!(ctx.animations.len(), 1);
        assert_eq!(ctx.animations[0].animation_id, "spin");
        assert_eq!(ctx.animations[0].target_id, "box");
        // glow, the id-less node, the broken animation and the lights namespace
        assert_eq!(report.warnings, 4);
    }

    #[test]
    fn test_auxiliary_files_and_sources() {
        let (mut ctx, root, mut report) = tables();
        let files = MemoryFiles::new()
            .with_file("res/box.material", "material red { vertexShader = a }\nmaterial blue { }")
            .with_file("res/box.physics", "rigidBody crate { type = MESH }");
        ctx.load_auxiliary_files(&files, &mut report);

        assert!(ctx.files["res/box.material"].is_some());
        assert!(ctx.files["res/box.animation"].is_none());
        assert_eq!(report.warnings, 5);

        let red = ctx.source(&root, "res/box.material", "red").unwrap();
        assert_eq!(red.get_str("vertexShader"), Some("a"));
        let first = ctx.source(&root, "res/box.material", "").unwrap();
        assert_eq!(first.id(), "red");
        assert!(matches!(
            ctx.source(&root, "res/box.material", "green"),
            Err(SourceError::NamespaceMissing { .. })
        ));
        assert!(matches!(
            ctx.source(&root, "res/box.animation", ""),
            Err(SourceError::FileNotLoaded(_))
        ));

        let boom = ctx.source(&root, "", "boom").unwrap();
        assert_eq!(boom.namespace_name(), "audio");
        assert!(ctx.source(&root, "", "level").is_err());

        // The mesh rigid body on `box` is captured under its pre-rename id.
        let set = ctx.mesh_rigid_body_set(&root, root.child_named("scene").unwrap());
        assert_eq!(set, HashSet::from(["crate".to_string()]));
    }

    #[test]
    fn test_url_without_node_id_is_skipped() {
        let root = Properties::parse(
            "scene\n{\n    node door\n    {\n        url = res/props.gpb\n        translate = 1, 0, 0\n    }\n}",
        )
        .unwrap();
        let mut ctx = LoadContext::new(PathBuf::new(), "gpb");
        let mut report = LoadReport::default();
        ctx.build_reference_tables(root.child_named("scene").unwrap(), &mut report);

        assert_eq!(report.warnings, 1);
        assert_eq!(ctx.node_properties.len(), 1);
        assert_eq!(ctx.node_properties[0].kind, NodePropertyKind::Translate);
        assert_eq!(ctx.raw_id("door"), "door");
        assert!(ctx.local_renames.is_empty());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path(Path::new("res"), "a.gpb"), PathBuf::from("res/a.gpb"));
        assert_eq!(resolve_path(Path::new(""), "a.gpb"), PathBuf::from("a.gpb"));
    }
}
