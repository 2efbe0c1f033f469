//! Boundary to the mesh file format.

use std::path::Path;

use crate::core::SortedFrameSet;
use crate::geom::{linear_interpolate, LoadMask, MeshMetadata, MeshSample};
use crate::sequence::FilenameSequence;
use crate::util::{Frame, Result};

/// A mesh read from disk together with its metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedMesh {
    pub mesh: MeshSample,
    pub metadata: MeshMetadata,
}

impl LoadedMesh {
    /// Create a loaded mesh.
    pub fn new(mesh: MeshSample, metadata: MeshMetadata) -> Self {
        Self { mesh, metadata }
    }
}

/// Reader of mesh snapshots.
///
/// `path` identifies the sequence (or the single file when `frame` is
/// `None`); the implementation maps a frame to its file.
pub trait MeshLoader {
    /// Load the parts of a snapshot selected by `mask`.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) or
    /// [`Error::FrameNotFound`](crate::Error::FrameNotFound) for missing data.
    fn load(&self, path: &Path, frame: Option<Frame>, mask: LoadMask) -> Result<LoadedMesh>;

    /// Blend two topologically consistent meshes.
    fn interpolate(&self, a: &MeshSample, b: &MeshSample, alpha: f32) -> Result<MeshSample> {
        linear_interpolate(a, b, alpha)
    }

    /// Frames available for the sequence at `path`.
    ///
    /// The default scans the directory of the filename pattern.
    fn discover_frames(&self, path: &Path) -> Result<SortedFrameSet> {
        Ok(FilenameSequence::open(path)?.frames().clone())
    }
}

impl<L: MeshLoader + ?Sized> MeshLoader for &L {
    fn load(&self, path: &Path, frame: Option<Frame>, mask: LoadMask) -> Result<LoadedMesh> {
        (**self).load(path, frame, mask)
    }

    fn interpolate(&self, a: &MeshSample, b: &MeshSample, alpha: f32) -> Result<MeshSample> {
        (**self).interpolate(a, b, alpha)
    }

    fn discover_frames(&self, path: &Path) -> Result<SortedFrameSet> {
        (**self).discover_frames(path)
    }
}
