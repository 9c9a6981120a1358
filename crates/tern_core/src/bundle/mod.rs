//! Bundle files.
//!
//! A bundle holds meshes and node hierarchies. The scene loader only talks
//! to bundles through [`BundleLoader`] and [`Bundle`]; the crate ships one
//! implementation over a serde [`BundleDocument`], served from memory
//! ([`MemoryBundles`]) or from JSON files on disk ([`JsonBundles`]).

mod document;

pub use document::*;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::scene::{Mesh, Node, Scene};

/// Errors that can occur while opening a bundle.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Bundle not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bundle data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Receives raw geometry for nodes that need mesh collision shapes.
///
/// A bundle asks [`MeshCaptureSink::wants`] for every node it builds with a
/// mesh. When the answer is yes it hands over the vertex bytes once and then
/// the index bytes of each mesh part, in part order. Ids are the node ids
/// as stored in the bundle.
pub trait MeshCaptureSink {
    fn wants(&self, node_id: &str) -> bool;

    fn capture_vertices(&mut self, node_id: &str, mesh: &Arc<Mesh>, vertex_bytes: &[u8]);

    fn capture_indices(&mut self, node_id: &str, index_bytes: &[u8]);
}

/// A sink that never captures anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCapture;

impl MeshCaptureSink for NoCapture {
    fn wants(&self, _node_id: &str) -> bool {
        false
    }

    fn capture_vertices(&mut self, _node_id: &str, _mesh: &Arc<Mesh>, _vertex_bytes: &[u8]) {}

    fn capture_indices(&mut self, _node_id: &str, _index_bytes: &[u8]) {}
}

/// An opened bundle.
pub trait Bundle {
    /// Build a scene. `None` selects the first scene in the bundle.
    fn load_scene(&self, id: Option<&str>, capture: &mut dyn MeshCaptureSink) -> Option<Scene>;

    /// Build a single node (and its children) by id.
    fn load_node(&self, id: &str, capture: &mut dyn MeshCaptureSink) -> Option<Node>;
}

/// Opens bundles by path.
pub trait BundleLoader {
    fn open(&self, path: &Path) -> BundleResult<Box<dyn Bundle>>;
}

/// Bundle documents held in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryBundles {
    documents: HashMap<PathBuf, Arc<BundleDocument>>,
    opens: AtomicUsize,
}

impl MemoryBundles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, document: BundleDocument) {
        self.documents.insert(path.into(), Arc::new(document));
    }

    pub fn with_bundle(mut self, path: impl Into<PathBuf>, document: BundleDocument) -> Self {
        self.insert(path, document);
        self
    }

    /// Number of successful [`BundleLoader::open`] calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

impl BundleLoader for MemoryBundles {
    fn open(&self, path: &Path) -> BundleResult<Box<dyn Bundle>> {
        let document = self
            .documents
            .get(path)
            .ok_or_else(|| BundleError::NotFound(path.to_path_buf()))?;
        self.opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(DocumentBundle::new(path, Arc::clone(document))))
    }
}

/// Reads JSON-encoded bundle documents from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonBundles;

impl BundleLoader for JsonBundles {
    fn open(&self, path: &Path) -> BundleResult<Box<dyn Bundle>> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BundleError::NotFound(path.to_path_buf()),
            _ => BundleError::Io(e),
        })?;
        let document = BundleDocument::from_json(&content)?;
        log::debug!("Opened bundle {}", path.display());
        Ok(Box::new(DocumentBundle::new(path, Arc::new(document))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bundles() {
        let bundles = MemoryBundles::new().with_bundle("res/a.gpb", BundleDocument::default());
        assert!(bundles.open(Path::new("res/a.gpb")).is_ok());
        assert!(matches!(
            bundles.open(Path::new("res/b.gpb")),
            Err(BundleError::NotFound(_))
        ));
        assert_eq!(bundles.open_count(), 1);
    }

    #[test]
    fn test_json_bundles_missing_file() {
        let result = JsonBundles.open(Path::new("definitely/not/here.gpb"));
        assert!(matches!(result, Err(BundleError::NotFound(_))));
    }
}
