//! Material ID assignment for exported meshes.

mod id_map;

pub use id_map::MaterialIdMap;
