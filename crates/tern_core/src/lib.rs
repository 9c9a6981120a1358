//! Tern Core - scene descriptions, scene graph and scene loading.
//!
//! This crate provides:
//!
//! - **Properties files**: the nested `namespace id { name = value }` format
//!   scene descriptions, materials and physics definitions are written in
//! - **Scene graph types**: `Scene`, `Node`, `Mesh`, `Model` and components
//! - **Collaborator seams**: bundles, physics worlds and animations, each
//!   with an in-crate implementation
//! - **Scene loading**: `SceneLoader`, which links all of the above
//!
//! # Example
//!
//! ```ignore
//! use tern_core::animation::AnimationController;
//! use tern_core::bundle::JsonBundles;
//! use tern_core::physics::PhysicsRegistry;
//! use tern_core::properties::FileSystem;
//! use tern_core::SceneLoader;
//!
//! let mut physics = PhysicsRegistry::new();
//! let mut animations = AnimationController::new();
//! let scene = SceneLoader::new(&FileSystem, &JsonBundles, &mut physics, &mut animations)
//!     .load("res/level.scene")?;
//! println!("Loaded {} nodes, {} rigid bodies",
//!     scene.node_count(),
//!     physics.rigid_bodies().len());
//! ```

pub mod animation;
pub mod bundle;
pub mod loader;
pub mod physics;
pub mod properties;
pub mod scene;
pub mod url;

// Re-export commonly used types
pub use loader::{LoadError, LoadReport, LoadResult, LoaderConfig, SceneLoader};
pub use properties::Properties;
pub use scene::{Model, Node, Scene};
