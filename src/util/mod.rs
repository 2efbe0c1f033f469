//! Utility types and functions for xmesh.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Frame`] - Frame number type
//! - [`BBox3f`] - Bounding box stored in mesh metadata
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
