//! Boundary to the mesh file writer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::geom::{MeshMetadata, MeshSample};
use crate::util::Result;

/// Writer of mesh files. Shared by the I/O threads of an export.
pub trait MeshWriter: Sync {
    fn write(&self, path: &Path, mesh: &MeshSample, metadata: &MeshMetadata) -> Result<()>;
}

impl<W: MeshWriter + ?Sized> MeshWriter for &W {
    fn write(&self, path: &Path, mesh: &MeshSample, metadata: &MeshMetadata) -> Result<()> {
        (**self).write(path, mesh, metadata)
    }
}

/// Writer keeping every written file in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<PathBuf, (MeshSample, MeshMetadata)>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths written so far, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    /// Number of files written.
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Mesh and metadata written to `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<(MeshSample, MeshMetadata)> {
        self.files.lock().get(path.as_ref()).cloned()
    }
}

impl MeshWriter for MemoryWriter {
    fn write(&self, path: &Path, mesh: &MeshSample, metadata: &MeshMetadata) -> Result<()> {
        self.files
            .lock()
            .insert(path.to_path_buf(), (mesh.clone(), metadata.clone()));
        Ok(())
    }
}
