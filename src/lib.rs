//! # xmesh
//!
//! Timing, sampling and caching engine for `.xmesh` polygon mesh sequences.
//!
//! A sequence is a directory of numbered mesh files. Given a host time, the
//! engine works out which files to read, how to blend or displace them so
//! that motion stays smooth between and beyond the stored frames, and keeps
//! the last loaded frames around for repeated evaluations. The reverse
//! direction exports meshes of a host scene as a sequence, with velocities
//! estimated by resampling the scene.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (frames, bounds, errors)
//! - [`core`] - Time mapping, sample planning and the mesh cache
//! - [`geom`] - Mesh samples, load masks, metadata and interpolation
//! - [`sequence`] - Filename patterns and directory scanning
//! - [`loader`] - Sequence loader settings and evaluation
//! - [`velocity`] - Host scene boundary and velocity estimation
//! - [`material`] - Material name to ID mapping
//! - [`save`] - Sequence export
//!
//! ## Example
//!
//! ```ignore
//! use xmesh::prelude::*;
//!
//! let settings = LoaderSettings::for_path("/cache/shot/fluid_####.xmesh");
//! let mut loader = SequenceLoader::new(my_mesh_reader, settings)?;
//! let eval = loader.evaluate(&EvalContext::new(12.5, 24.0));
//! println!("{} vertices", eval.mesh.num_vertices());
//! ```

pub mod util;
pub mod core;
pub mod geom;
pub mod sequence;
pub mod loader;
pub mod velocity;
pub mod material;
pub mod save;

// Re-export commonly used types
pub use util::{Error, Frame, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{BBox3f, Error, Frame, Result};
    pub use crate::core::{
        ClampMode, ClampPolicy, FrameRange, FrameSet, LoadingMode, MeshCache, PlaybackGraph,
        SamplePlan, SortedFrameSet, Timing,
    };
    pub use crate::geom::{LoadMask, MeshMetadata, MeshSample};
    pub use crate::sequence::{FilenamePattern, FilenameSequence};
    pub use crate::loader::{
        DisplayMode, EvalContext, Evaluation, LoadedMesh, LoaderSettings, MeshLoader, SequenceLoader,
    };
    pub use crate::velocity::{estimate_velocities, Scene};
    pub use crate::material::MaterialIdMap;
    pub use crate::save::{MeshSaver, MeshWriter, SaveOptions};
}
