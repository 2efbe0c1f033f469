//! Sample planning.
//!
//! Given a source frame and the frames available on disk, decide which
//! frame(s) to load and how to reach the requested time from them: either
//! one frame plus a residual offset for velocity extrapolation, or a
//! bracket of two frames and a blend factor.

use crate::util::{Error, Frame, Result};

use super::frame_set::FrameSet;
use super::timing::{ClampMode, FrameRange, RangeRegion};

/// Granularity used when looking for frames inside the range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameStep {
    /// Prefer whole frames, falling back to the closest available frames.
    #[default]
    Whole,
    /// Use every available frame, including subframes.
    Subframe,
}

/// Clamp modes applied before and after the usable range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClampPolicy {
    pub start: ClampMode,
    pub end: ClampMode,
}

impl ClampPolicy {
    /// Same mode on both ends.
    pub const fn both(mode: ClampMode) -> Self {
        Self { start: mode, end: mode }
    }

    /// True when `region` should produce no geometry.
    #[inline]
    pub fn is_blank(&self, region: RangeRegion) -> bool {
        match region {
            RangeRegion::Before => self.start == ClampMode::Blank,
            RangeRegion::After => self.end == ClampMode::Blank,
            RangeRegion::Inside => false,
        }
    }
}

/// What to load for one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SamplePlan {
    /// Nothing; the caller produces an empty mesh.
    Blank,
    /// One frame, displaced by `offset` frames along its velocity.
    Frame { frame: Frame, offset: Frame },
    /// Two frames blended by `alpha` in `[0, 1]`.
    Bracket { lo: Frame, hi: Frame, alpha: f64 },
}

/// A sample plan together with the range region it was made for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedSample {
    pub region: RangeRegion,
    pub plan: SamplePlan,
}

impl PlannedSample {
    /// Check if the plan asks for an empty result.
    #[inline]
    pub fn is_blank(&self) -> bool {
        matches!(self.plan, SamplePlan::Blank)
    }
}

/// Usable frame bounds: the available frames, narrowed by the custom range.
struct Bounds {
    lo: Frame,
    hi: Frame,
    first: Frame,
    last: Frame,
}

fn bounds(frames: &dyn FrameSet, range: Option<FrameRange>) -> Result<Bounds> {
    let (Some(min), Some(max)) = (frames.min(), frames.max()) else {
        return Err(Error::EmptyFrameSet);
    };
    let (lo, hi) = match range {
        Some(r) => (r.start.max(min), r.end.min(max)),
        None => (min, max),
    };
    // Boundary frames that actually exist on disk
    let first = frames.ceil(lo).filter(|&f| f <= hi.max(lo)).unwrap_or(max);
    let last = frames.floor(hi).filter(|&f| f >= lo.min(hi)).unwrap_or(min);
    Ok(Bounds { lo, hi, first, last })
}

fn classify(source: Frame, b: &Bounds) -> RangeRegion {
    if source < b.lo {
        RangeRegion::Before
    } else if source > b.hi {
        RangeRegion::After
    } else {
        RangeRegion::Inside
    }
}

/// Plan a velocity-offset sample for `source`.
///
/// Outside the usable range the boundary frame is used and the residual
/// offset reaches back to `source`, unless the clamp mode for that side is
/// [`ClampMode::Blank`].
pub fn plan_offset(
    source: Frame,
    frames: &dyn FrameSet,
    range: Option<FrameRange>,
    step: FrameStep,
    clamp: ClampPolicy,
) -> Result<PlannedSample> {
    let b = bounds(frames, range)?;
    let region = classify(source, &b);
    if clamp.is_blank(region) {
        return Ok(PlannedSample { region, plan: SamplePlan::Blank });
    }

    let frame = match region {
        RangeRegion::Before => b.first,
        RangeRegion::After => b.last,
        RangeRegion::Inside => match step {
            FrameStep::Whole => {
                let rounded = source.round();
                if frames.exists(rounded) {
                    rounded
                } else {
                    frames.nearest(source).ok_or(Error::EmptyFrameSet)?
                }
            }
            FrameStep::Subframe => frames
                .floor(source)
                .or_else(|| frames.ceil(source))
                .ok_or(Error::EmptyFrameSet)?,
        },
    };

    tracing::trace!(source, frame, ?region, "planned velocity offset sample");
    Ok(PlannedSample {
        region,
        plan: SamplePlan::Frame { frame, offset: source - frame },
    })
}

/// Plan a two-frame interpolation bracket for `source`.
///
/// Outside the usable range both ends collapse onto the boundary frame with
/// `alpha == 0`, unless the clamp mode for that side is [`ClampMode::Blank`].
pub fn plan_bracket(
    source: Frame,
    frames: &dyn FrameSet,
    range: Option<FrameRange>,
    step: FrameStep,
    clamp: ClampPolicy,
) -> Result<PlannedSample> {
    let b = bounds(frames, range)?;
    let region = classify(source, &b);
    if clamp.is_blank(region) {
        return Ok(PlannedSample { region, plan: SamplePlan::Blank });
    }

    let (lo, hi) = match region {
        RangeRegion::Before => (Some(b.first), Some(b.first)),
        RangeRegion::After => (Some(b.last), Some(b.last)),
        RangeRegion::Inside => {
            let whole = (source.floor(), source.ceil());
            if step == FrameStep::Whole && frames.exists(whole.0) && frames.exists(whole.1) {
                (Some(whole.0), Some(whole.1))
            } else {
                (frames.floor(source), frames.ceil(source))
            }
        }
    };

    let (lo, hi) = match (lo, hi) {
        (Some(lo), Some(hi)) => (lo, hi),
        (Some(f), None) | (None, Some(f)) => (f, f),
        (None, None) => return Err(Error::EmptyFrameSet),
    };

    let alpha = if hi > lo {
        ((source - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    tracing::trace!(source, lo, hi, alpha, ?region, "planned interpolation bracket");
    Ok(PlannedSample { region, plan: SamplePlan::Bracket { lo, hi, alpha } })
}
