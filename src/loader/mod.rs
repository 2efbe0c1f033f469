//! Mesh sequence loading.
//!
//! - [`MeshLoader`] - Reader boundary to the mesh file format
//! - [`MemoryLoader`] - Loader over meshes held in memory
//! - [`LoaderSettings`] - Persistent per-sequence settings
//! - [`SequenceLoader`] - Evaluates a sequence at an output time

mod evaluate;
mod memory;
mod settings;
mod source;

pub use evaluate::{EvalContext, Evaluation, SequenceLoader};
pub use memory::MemoryLoader;
pub use settings::{DisplayMode, LoaderSettings, SequenceSource};
pub use source::{LoadedMesh, MeshLoader};
