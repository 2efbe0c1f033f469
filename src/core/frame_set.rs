//! Sets of frame numbers available on disk.
//!
//! The timing engine only ever queries a frame set. [`FrameSet`] is the
//! narrow interface it consumes; [`SortedFrameSet`] is the implementation
//! built by the filename sequence scanner.

use crate::util::Frame;

/// Read-only view of the frames available for one sequence.
pub trait FrameSet {
    /// True when no frame is available.
    fn is_empty(&self) -> bool;

    /// Number of available frames.
    fn len(&self) -> usize;

    /// Check whether `frame` is available.
    fn exists(&self, frame: Frame) -> bool;

    /// Smallest available frame.
    fn min(&self) -> Option<Frame>;

    /// Largest available frame.
    fn max(&self) -> Option<Frame>;

    /// Greatest available frame `<= frame`.
    fn floor(&self, frame: Frame) -> Option<Frame>;

    /// Least available frame `>= frame`.
    fn ceil(&self, frame: Frame) -> Option<Frame>;

    /// Available frame closest to `frame`, ties resolved towards the lower one.
    fn nearest(&self, frame: Frame) -> Option<Frame> {
        match (self.floor(frame), self.ceil(frame)) {
            (Some(lo), Some(hi)) => {
                if (frame - lo).abs() <= (hi - frame).abs() {
                    Some(lo)
                } else {
                    Some(hi)
                }
            }
            (lo, hi) => lo.or(hi),
        }
    }
}

/// Frame set backed by a sorted, deduplicated vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SortedFrameSet {
    frames: Vec<Frame>,
}

impl SortedFrameSet {
    /// Create an empty frame set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contiguous whole frames `first..=last`.
    pub fn range(first: i64, last: i64) -> Self {
        (first..=last).map(|f| f as Frame).collect()
    }

    /// Add a frame. Non-finite values are ignored.
    pub fn insert(&mut self, frame: Frame) {
        if !frame.is_finite() {
            return;
        }
        let idx = self.frames.partition_point(|&f| f < frame);
        if self.frames.get(idx) != Some(&frame) {
            self.frames.insert(idx, frame);
        }
    }

    /// Remove every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames in ascending order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Iterate frames in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.iter().copied()
    }
}

impl FromIterator<Frame> for SortedFrameSet {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        let mut frames: Vec<Frame> = iter.into_iter().filter(|f| f.is_finite()).collect();
        frames.sort_by(|a, b| a.total_cmp(b));
        frames.dedup();
        Self { frames }
    }
}

impl FrameSet for SortedFrameSet {
    #[inline]
    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn exists(&self, frame: Frame) -> bool {
        let idx = self.frames.partition_point(|&f| f < frame);
        self.frames.get(idx) == Some(&frame)
    }

    #[inline]
    fn min(&self) -> Option<Frame> {
        self.frames.first().copied()
    }

    #[inline]
    fn max(&self) -> Option<Frame> {
        self.frames.last().copied()
    }

    fn floor(&self, frame: Frame) -> Option<Frame> {
        // Binary search for the first frame past `frame`
        let idx = self.frames.partition_point(|&f| f <= frame);
        if idx == 0 { None } else { Some(self.frames[idx - 1]) }
    }

    fn ceil(&self, frame: Frame) -> Option<Frame> {
        let idx = self.frames.partition_point(|&f| f < frame);
        self.frames.get(idx).copied()
    }
}
