//! Export of scene meshes to `.xmesh` sequences.

mod options;
mod saver;
mod writer;

pub use options::{
    parse_channel_list, sample_times, validate_channels, SaveOptions, KNOWN_CHANNELS, XMESH_EXTENSION,
};
pub use saver::{io_thread_count, MeshSaver, SaveStats};
pub use writer::{MemoryWriter, MeshWriter};
