//! In-memory mesh loader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::SortedFrameSet;
use crate::geom::{LoadMask, MeshMetadata, MeshSample};
use crate::util::{Error, Frame, Result};

use super::source::{LoadedMesh, MeshLoader};

/// Loader serving meshes registered in memory.
///
/// Honors the load mask the way a file reader would and counts every
/// successful or failed load.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    meshes: HashMap<(PathBuf, Option<u64>), LoadedMesh>,
    loads: AtomicUsize,
}

impl MemoryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mesh` as `frame` of the sequence `path`.
    pub fn insert_frame(&mut self, path: impl Into<PathBuf>, frame: Frame, mesh: MeshSample) {
        self.insert(path, Some(frame), LoadedMesh::new(mesh, MeshMetadata::new()));
    }

    /// Register `mesh` as the single file `path`.
    pub fn insert_static(&mut self, path: impl Into<PathBuf>, mesh: MeshSample) {
        self.insert(path, None, LoadedMesh::new(mesh, MeshMetadata::new()));
    }

    /// Register a mesh with explicit metadata.
    pub fn insert(&mut self, path: impl Into<PathBuf>, frame: Option<Frame>, loaded: LoadedMesh) {
        self.meshes.insert((path.into(), frame.map(f64::to_bits)), loaded);
    }

    /// Number of `load` calls so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl MeshLoader for MemoryLoader {
    fn load(&self, path: &Path, frame: Option<Frame>, mask: LoadMask) -> Result<LoadedMesh> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let stored = self
            .meshes
            .get(&(path.to_path_buf(), frame.map(f64::to_bits)))
            .ok_or_else(|| match frame {
                Some(frame) => Error::FrameNotFound { path: path.to_path_buf(), frame },
                None => Error::NotFound(path.to_path_buf()),
            })?;

        let mut metadata = stored.metadata.clone();
        if metadata.bounds.is_none() {
            metadata.bounds = Some(stored.mesh.compute_bounds());
        }

        if mask.is_box_only() {
            return Ok(LoadedMesh::new(MeshSample::new(), metadata));
        }

        let src = &stored.mesh;
        let mut mesh = MeshSample::new();
        if mask.contains(LoadMask::VERTS) {
            mesh.positions = src.positions.clone();
        }
        if mask.contains(LoadMask::FACES) {
            mesh.face_counts = src.face_counts.clone();
            mesh.face_indices = src.face_indices.clone();
        }
        if mask.contains(LoadMask::VELOCITY) {
            mesh.velocities = src.velocities.clone();
        }
        if mask.contains(LoadMask::MAPS) {
            mesh.material_ids = src.material_ids.clone();
        }
        Ok(LoadedMesh::new(mesh, metadata))
    }

    fn discover_frames(&self, path: &Path) -> Result<SortedFrameSet> {
        Ok(self
            .meshes
            .keys()
            .filter(|(p, _)| p == path)
            .filter_map(|(_, frame)| frame.map(f64::from_bits))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FrameSet;
    use crate::util::Vec3;

    fn tri() -> MeshSample {
        let mut m = MeshSample::from_polygons(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[&[0, 1, 2]],
        );
        m.velocities = Some(vec![Vec3::Z; 3]);
        m.material_ids = Some(vec![4]);
        m
    }

    #[test]
    fn test_load_respects_mask() {
        let mut loader = MemoryLoader::new();
        loader.insert_frame("seq", 1.0, tri());
        let p = Path::new("seq");

        let full = loader.load(p, Some(1.0), LoadMask::STATIC_MESH | LoadMask::VELOCITY).unwrap();
        assert_eq!(full.mesh, tri());

        let stat = loader.load(p, Some(1.0), LoadMask::STATIC_MESH).unwrap();
        assert!(stat.mesh.velocities.is_none());
        assert_eq!(stat.mesh.material_ids, Some(vec![4]));

        let verts = loader.load(p, Some(1.0), LoadMask::VERTS).unwrap();
        assert_eq!(verts.mesh.num_vertices(), 3);
        assert_eq!(verts.mesh.num_faces(), 0);

        let bbox = loader.load(p, Some(1.0), LoadMask::BOX).unwrap();
        assert!(bbox.mesh.is_empty());
        assert_eq!(bbox.metadata.bounds.unwrap().max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(loader.load_count(), 4);
    }

    #[test]
    fn test_missing_data() {
        let mut loader = MemoryLoader::new();
        loader.insert_frame("seq", 1.0, tri());
        assert!(matches!(
            loader.load(Path::new("seq"), Some(2.0), LoadMask::VERTS),
            Err(Error::FrameNotFound { .. })
        ));
        assert!(matches!(
            loader.load(Path::new("single.xmesh"), None, LoadMask::VERTS),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_discover_frames() {
        let mut loader = MemoryLoader::new();
        for f in [3.0, 1.0, 2.5] {
            loader.insert_frame("seq", f, tri());
        }
        loader.insert_frame("other", 9.0, tri());
        loader.insert_static("seq", tri());
        let frames = loader.discover_frames(Path::new("seq")).unwrap();
        assert_eq!(frames.frames(), &[1.0, 2.5, 3.0]);
        assert_eq!(frames.len(), 3);
    }
}
