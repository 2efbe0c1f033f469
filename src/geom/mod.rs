//! Mesh snapshot types.
//!
//! - [`MeshSample`] - Geometry and channels of one cached frame
//! - [`MeshMetadata`] - Bounds, frame rate and units stored with a frame
//! - [`LoadMask`] - Which parts of a file to read
//! - [`linear_interpolate`] - Blend two consistent meshes

mod interpolate;
mod mask;
mod mesh;
mod metadata;

pub use interpolate::linear_interpolate;
pub use mask::LoadMask;
pub use mesh::{fractional_indices, MeshSample, MATERIAL_ID_CHANNEL, VELOCITY_CHANNEL};
pub use metadata::{rational_fps, LengthUnit, MeshMetadata};
