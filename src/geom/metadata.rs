//! Per-file mesh metadata.

use crate::util::BBox3f;

/// Unit of the lengths stored in a mesh file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthUnit {
    #[default]
    Unitless,
    Centimeters,
    Meters,
    Inches,
}

/// Metadata stored next to a mesh snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshMetadata {
    /// Bounding box of the stored geometry.
    pub bounds: Option<BBox3f>,
    /// Frames per second as a rational `(numerator, denominator)`.
    pub frames_per_second: Option<(i64, i64)>,
    /// Scale and unit of the stored lengths.
    pub length_unit: Option<(f64, LengthUnit)>,
}

impl MeshMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a bounding box is present.
    #[inline]
    pub fn has_bounds(&self) -> bool {
        self.bounds.is_some()
    }

    /// Store `fps` as a rational number.
    pub fn set_frames_per_second(&mut self, fps: f64) {
        self.frames_per_second = Some(rational_fps(fps));
    }

    /// Frame rate as a float.
    pub fn fps(&self) -> Option<f64> {
        self.frames_per_second
            .filter(|&(_, d)| d != 0)
            .map(|(n, d)| n as f64 / d as f64)
    }
}

/// Rational representation of a frame rate.
///
/// Whole rates map to `(fps, 1)`, NTSC-style rates to `(n * 1000, 1001)`,
/// anything else is kept to a millionth.
pub fn rational_fps(fps: f64) -> (i64, i64) {
    const EPS: f64 = 1e-6;
    if (fps - fps.round()).abs() < EPS {
        return (fps.round() as i64, 1);
    }
    let ntsc = fps * 1.001;
    if (ntsc - ntsc.round()).abs() < 1e-3 {
        return (ntsc.round() as i64 * 1000, 1001);
    }
    ((fps * 1_000_000.0).round() as i64, 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_fps() {
        assert_eq!(rational_fps(24.0), (24, 1));
        assert_eq!(rational_fps(30000.0 / 1001.0), (30000, 1001));
        assert_eq!(rational_fps(29.97), (30000, 1001));
        assert_eq!(rational_fps(12.5), (12_500_000, 1_000_000));
    }

    #[test]
    fn test_fps_roundtrip() {
        let mut m = MeshMetadata::new();
        assert_eq!(m.fps(), None);
        m.set_frames_per_second(25.0);
        assert_eq!(m.fps(), Some(25.0));
        assert!(!m.has_bounds());
    }
}
