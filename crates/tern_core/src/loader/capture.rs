//! Raw geometry kept for mesh rigid bodies.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::bundle::MeshCaptureSink;
use crate::scene::Mesh;

/// Counters shared with whoever wants to watch captured buffers come and go.
#[derive(Debug, Default)]
pub struct CaptureStats {
    live_buffers: AtomicUsize,
    live_bytes: AtomicUsize,
    total_buffers: AtomicUsize,
}

impl CaptureStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Buffers captured and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::SeqCst)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Buffers captured since creation.
    pub fn total_buffers(&self) -> usize {
        self.total_buffers.load(Ordering::SeqCst)
    }

    fn allocated(&self, bytes: usize) {
        self.live_buffers.fetch_add(1, Ordering::SeqCst);
        self.live_bytes.fetch_add(bytes, Ordering::SeqCst);
        self.total_buffers.fetch_add(1, Ordering::SeqCst);
    }

    fn released(&self, buffers: usize, bytes: usize) {
        self.live_buffers.fetch_sub(buffers, Ordering::SeqCst);
        self.live_bytes.fetch_sub(bytes, Ordering::SeqCst);
    }
}

/// Vertex bytes and per-part index bytes of one captured node.
#[derive(Debug)]
pub struct MeshRigidBodyData {
    mesh: Arc<Mesh>,
    vertex_data: Vec<u8>,
    index_data: Vec<Vec<u8>>,
    stats: Option<Arc<CaptureStats>>,
}

impl MeshRigidBodyData {
    fn new(mesh: Arc<Mesh>, vertex_bytes: &[u8], stats: Option<Arc<CaptureStats>>) -> Self {
        if let Some(stats) = &stats {
            stats.allocated(vertex_bytes.len());
        }
        Self {
            mesh,
            vertex_data: vertex_bytes.to_vec(),
            index_data: Vec::new(),
            stats,
        }
    }

    fn push_indices(&mut self, index_bytes: &[u8]) {
        if let Some(stats) = &self.stats {
            stats.allocated(index_bytes.len());
        }
        self.index_data.push(index_bytes.to_vec());
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn vertex_data(&self) -> &[u8] {
        &self.vertex_data
    }

    /// One buffer per mesh part, in part order.
    pub fn index_data(&self) -> &[Vec<u8>] {
        &self.index_data
    }
}

impl Drop for MeshRigidBodyData {
    fn drop(&mut self) {
        if let Some(stats) = &self.stats {
            let bytes = self.vertex_data.len() + self.index_data.iter().map(Vec::len).sum::<usize>();
            stats.released(1 + self.index_data.len(), bytes);
        }
    }
}

/// The capture table of one load.
///
/// Bundles report raw node ids; data is stored under the final id the node
/// will carry in the scene, using the aliases active at capture time.
pub(crate) struct MeshCapture {
    wanted: HashSet<String>,
    aliases: HashMap<String, String>,
    data: HashMap<String, MeshRigidBodyData>,
    stats: Option<Arc<CaptureStats>>,
}

impl MeshCapture {
    pub fn new(wanted: HashSet<String>, stats: Option<Arc<CaptureStats>>) -> Self {
        Self {
            wanted,
            aliases: HashMap::new(),
            data: HashMap::new(),
            stats,
        }
    }

    /// Replace the raw id -> final id aliases.
    pub fn set_aliases(&mut self, aliases: HashMap<String, String>) {
        self.aliases = aliases;
    }

    /// Data captured for the node whose final id is `node_id`.
    pub fn get(&self, node_id: &str) -> Option<&MeshRigidBodyData> {
        self.data.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    fn key(&self, raw_id: &str) -> String {
        self.aliases
            .get(raw_id)
            .cloned()
            .unwrap_or_else(|| raw_id.to_string())
    }
}

impl MeshCaptureSink for MeshCapture {
    fn wants(&self, node_id: &str) -> bool {
        self.wanted.contains(node_id)
    }

    fn capture_vertices(&mut self, node_id: &str, mesh: &Arc<Mesh>, vertex_bytes: &[u8]) {
        let key = self.key(node_id);
        let data = MeshRigidBodyData::new(Arc::clone(mesh), vertex_bytes, self.stats.clone());
        if self.data.insert(key.clone(), data).is_some() {
            log::warn!("Replacing mesh rigid body data captured earlier for '{}'", key);
        }
    }

    fn capture_indices(&mut self, node_id: &str, index_bytes: &[u8]) {
        let key = self.key(node_id);
        match self.data.get_mut(&key) {
            Some(data) => data.push_indices(index_bytes),
            None => log::warn!("Index data for '{}' arrived before its vertex data", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshPart;
    use tern_math::Vec3;

    fn mesh() -> Arc<Mesh> {
        Arc::new(Mesh::new(
            "tri",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![MeshPart::new(vec![0, 1, 2])],
        ))
    }

    #[test]
    fn test_capture_keys_by_alias() {
        let stats = CaptureStats::new();
        let mut capture = MeshCapture::new(HashSet::from(["raw".to_string()]), Some(stats.clone()));
        capture.set_aliases(HashMap::from([("raw".to_string(), "final".to_string())]));

        assert!(capture.wants("raw"));
        assert!(!capture.wants("final"));

        let mesh = mesh();
        capture.capture_vertices("raw", &mesh, mesh.vertex_bytes());
        capture.capture_indices("raw", mesh.parts[0].index_bytes());

        let data = capture.get("final").unwrap();
        assert_eq!(data.vertex_data().len(), 36);
        assert_eq!(data.index_data().len(), 1);
        assert_eq!(stats.live_buffers(), 2);
        assert_eq!(stats.live_bytes(), 48);
    }

    #[test]
    fn test_drop_releases_buffers() {
        let stats = CaptureStats::new();
        {
            let mut capture = MeshCapture::new(HashSet::from(["n".to_string()]), Some(stats.clone()));
            let mesh = mesh();
            capture.capture_vertices("n", &mesh, mesh.vertex_bytes());
            capture.capture_indices("n", mesh.parts[0].index_bytes());
            // Recapturing replaces (and releases) the first buffers.
            capture.capture_vertices("n", &mesh, mesh.vertex_bytes());
            assert_eq!(stats.live_buffers(), 1);
        }
        assert_eq!(stats.live_buffers(), 0);
        assert_eq!(stats.live_bytes(), 0);
        assert_eq!(stats.total_buffers(), 3);
    }

    #[test]
    fn test_indices_without_vertices_are_ignored() {
        let mut capture = MeshCapture::new(HashSet::new(), None);
        capture.capture_indices("n", &[0, 0, 0, 0]);
        assert_eq!(capture.len(), 0);
    }
}
