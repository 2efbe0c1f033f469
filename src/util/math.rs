//! Math type re-exports and mesh-cache specific math utilities.
//!
//! This module re-exports the `glam` types used across the crate and
//! provides the bounding box type stored in mesh metadata.

pub use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use std::fmt;

/// Frame number. Output times may be fractional; stored frames are
/// integers or sequence-defined subframes.
pub type Frame = f64;

/// 3D bounding box with single precision.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox3f {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox3f {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounding box of a point cloud. Empty for no points.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut b = Self::EMPTY;
        for &p in points {
            b.expand_by_point(p);
        }
        b
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn expand_by_box(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (extents) of the box.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Default for BBox3f {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BBox3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox3f({:?} - {:?})", self.min, self.max)
    }
}

/// Per-frame derivative of a transform sampled `step` frames apart.
///
/// The result is applied to homogeneous points, so a constant translation
/// contributes nothing and a moving one contributes its per-frame motion.
pub fn transform_derivative(start: &Mat4, end: &Mat4, step: f32) -> Mat4 {
    (*end - *start) * (1.0 / step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox3f() {
        let mut b = BBox3f::EMPTY;
        assert!(b.is_empty());

        b.expand_by_point(Vec3::ZERO);
        assert!(!b.is_empty());
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ZERO);

        b.expand_by_point(Vec3::ONE);
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ONE);
        assert_eq!(b.center(), Vec3::splat(0.5));
        assert_eq!(b.size(), Vec3::ONE);
    }

    #[test]
    fn test_bbox_from_points() {
        assert!(BBox3f::from_points(&[]).is_empty());

        let b = BBox3f::from_points(&[Vec3::new(-1.0, 2.0, 0.0), Vec3::new(1.0, -2.0, 3.0)]);
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_transform_derivative_translation() {
        let a = Mat4::from_translation(Vec3::ZERO);
        let b = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let d = transform_derivative(&a, &b, 0.25);
        let v = d * Vec4::new(5.0, 5.0, 5.0, 1.0);
        assert!((v.x - 4.0).abs() < 1e-5);
        assert!(v.y.abs() < 1e-5);
    }
}
