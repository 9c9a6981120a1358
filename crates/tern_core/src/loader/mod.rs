//! Scene loading.
//!
//! Turns a scene description into a linked [`Scene`]. The description names
//! one primary bundle and any number of auxiliary files; references between
//! them are recorded first and resolved in a fixed order of passes:
//!
//! 1. reference tables (pending node properties, animations, files)
//! 2. auxiliary properties files
//! 3. primary bundle, capturing mesh data for mesh rigid bodies
//! 4. node URLs (renames and stitched nodes)
//! 5. components and transforms
//! 6. rigid bodies
//! 7. animations
//! 8. physics constraints
//!
//! Only a missing or unparseable scene description, a missing `scene`
//! namespace, or a broken primary bundle fail the load. Everything else is
//! logged, counted in the [`LoadReport`] and skipped.
//!
//! # Example
//!
//! ```ignore
//! use tern_core::animation::AnimationController;
//! use tern_core::bundle::JsonBundles;
//! use tern_core::loader::SceneLoader;
//! use tern_core::physics::PhysicsRegistry;
//! use tern_core::properties::FileSystem;
//!
//! let mut physics = PhysicsRegistry::new();
//! let mut animations = AnimationController::new();
//! let mut loader = SceneLoader::new(&FileSystem, &JsonBundles, &mut physics, &mut animations);
//! let scene = loader.load("res/level.scene")?;
//! println!("{} nodes, {} warnings", scene.node_count(), loader.last_report().warnings);
//! ```

/// Log a recoverable failure and count it.
macro_rules! skip {
    ($report:expr, $($arg:tt)+) => {{
        log::warn!($($arg)+);
        $report.warnings += 1;
    }};
}

mod animations;
mod capture;
mod constraints;
mod context;
mod nodes;


pub use capture::{CaptureStats, MeshRigidBodyData};
pub use context::{NodePropertyKind, SceneAnimation, SceneNodeProperty};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::AnimationController;
use crate::bundle::BundleLoader;
use crate::physics::PhysicsWorld;
use crate::properties::{Properties, PropertiesError, PropertiesSource};
use crate::scene::{ComponentFactory, DefaultComponents, Scene};
use capture::MeshCapture;
use context::{resolve_path, BundleCache, LoadContext};

/// Errors that abort a load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Scene description error: {0}")]
    Properties(#[from] PropertiesError),

    #[error("No scene namespace in scene description")]
    NoScene,

    #[error("Failed to load bundle {path}: {reason}")]
    Bundle { path: PathBuf, reason: String },

    #[error("Bundle {0} does not contain the requested scene")]
    NoBundleScene(PathBuf),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Loader settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Files with this extension are bundles, everything else is a properties file
    pub bundle_extension: String,
    /// Directory relative references resolve against. Defaults to the
    /// directory of the scene description.
    pub base_dir: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            bundle_extension: "gpb".to_string(),
            base_dir: None,
        }
    }
}

impl LoaderConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// What one load did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub nodes_stitched: usize,
    pub properties_applied: usize,
    pub rigid_bodies: usize,
    pub animations: usize,
    pub constraints: usize,
    /// Recoverable failures that were logged and skipped
    pub warnings: usize,
}

/// Loads scene descriptions against a set of collaborators.
///
/// Rigid bodies and constraints go to the physics world, animations to the
/// animation controller; both outlive the loader.
pub struct SceneLoader<'a> {
    files: &'a dyn PropertiesSource,
    bundles: &'a dyn BundleLoader,
    components: &'a dyn ComponentFactory,
    physics: &'a mut dyn PhysicsWorld,
    animations: &'a mut AnimationController,
    config: LoaderConfig,
    stats: Option<Arc<CaptureStats>>,
    report: LoadReport,
}

impl<'a> SceneLoader<'a> {
    pub fn new(
        files: &'a dyn PropertiesSource,
        bundles: &'a dyn BundleLoader,
        physics: &'a mut dyn PhysicsWorld,
        animations: &'a mut AnimationController,
    ) -> Self {
        Self {
            files,
            bundles,
            components: &DefaultComponents,
            physics,
            animations,
            config: LoaderConfig::default(),
            stats: None,
            report: LoadReport::default(),
        }
    }

    pub fn with_components(mut self, components: &'a dyn ComponentFactory) -> Self {
        self.components = components;
        self
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Count the mesh buffers captured for mesh rigid bodies.
    pub fn with_capture_stats(mut self, stats: Arc<CaptureStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Load the scene description at `path`.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> LoadResult<Scene> {
        let path = path.as_ref();
        log::info!("Loading scene {}", path.display());

        let base_dir = self
            .config
            .base_dir
            .clone()
            .or_else(|| path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let mut report = LoadReport::default();
        let result = self
            .files
            .load_properties(path)
            .map_err(LoadError::from)
            .and_then(|root| self.run(&root, &base_dir, &mut report));
        self.finish(report, result)
    }

    /// Load a scene description from text.
    ///
    /// Relative references resolve against `base_dir`, else the configured
    /// base directory, else the working directory.
    pub fn load_from_str(&mut self, text: &str, base_dir: Option<&Path>) -> LoadResult<Scene> {
        let base_dir = base_dir
            .map(Path::to_path_buf)
            .or_else(|| self.config.base_dir.clone())
            .unwrap_or_default();
        let mut report = LoadReport::default();
        let result = Properties::parse(text)
            .map_err(LoadError::from)
            .and_then(|root| self.run(&root, &base_dir, &mut report));
        self.finish(report, result)
    }

    /// Report of the most recent load, also when it failed.
    pub fn last_report(&self) -> &LoadReport {
        &self.report
    }

    fn finish(&mut self, report: LoadReport, result: LoadResult<Scene>) -> LoadResult<Scene> {
        match &result {
            Ok(scene) => log::info!(
                "Loaded scene '{}': {} nodes, {} stitched, {} properties, {} rigid bodies, \
                 {} animations, {} constraints, {} warnings",
                scene.id,
                scene.node_count(),
                report.nodes_stitched,
                report.properties_applied,
                report.rigid_bodies,
                report.animations,
                report.constraints,
                report.warnings
            ),
            Err(e) => log::error!("Scene load failed: {}", e),
        }
        self.report = report;
        result
    }

    fn run(&mut self, root: &Properties, base_dir: &Path, report: &mut LoadReport) -> LoadResult<Scene> {
        let scene_ns = root.child_named("scene").ok_or(LoadError::NoScene)?;

        let mut ctx = LoadContext::new(base_dir.to_path_buf(), &self.config.bundle_extension);
        ctx.build_reference_tables(scene_ns, report);
        ctx.load_auxiliary_files(self.files, report);

        let mut capture = MeshCapture::new(ctx.mesh_rigid_body_set(root, scene_ns), self.stats.clone());
        let mut bundles = BundleCache::new(self.bundles, base_dir);

        let mut scene = match scene_ns.get_str("path").filter(|p| !p.is_empty()) {
            Some(path) => {
                let bundle = bundles.get(path).map_err(|e| LoadError::Bundle {
                    path: resolve_path(base_dir, path),
                    reason: e.to_string(),
                })?;
                let name = Some(scene_ns.id()).filter(|id| !id.is_empty());
                capture.set_aliases(ctx.local_renames.clone());
                let scene = bundle
                    .load_scene(name, &mut capture)
                    .ok_or_else(|| LoadError::NoBundleScene(resolve_path(base_dir, path)))?;
                capture.set_aliases(HashMap::new());
                scene
            }
            None => {
                log::debug!("Scene '{}' has no bundle path", scene_ns.id());
                Scene::new(scene_ns.id())
            }
        };

        let urls = ctx.take_url_properties();
        nodes::resolve_urls(&urls, &mut scene, &mut bundles, &mut capture, report);
        log::debug!("Captured mesh data for {} nodes", capture.len());

        if let Some(camera) = scene_ns.get_str("activeCamera") {
            if !scene.set_active_camera(camera) {
                skip!(report, "Active camera node '{}' is missing or has no camera", camera);
            }
        }

        nodes::apply_node_properties(&ctx, root, scene_ns, &mut scene, self.components, report);
        nodes::apply_rigid_bodies(
            &ctx,
            root,
            scene_ns,
            &mut scene,
            &mut *self.physics,
            &capture,
            report,
        );
        animations::materialize_animations(&ctx, root, &scene, self.animations, report);
        constraints::load_physics(scene_ns, &mut scene, &mut *self.physics, report);

        Ok(scene)
    }
}
