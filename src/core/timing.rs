//! Mapping of host output time to source sequence time.
//!
//! A [`Timing`] carries the per-evaluation configuration of a sequence:
//! frame offset, optional custom range and optional playback graph. It holds
//! no state beyond that configuration and is rebuilt for every evaluation.

use crate::util::{Error, Frame, Result};

use super::frame_set::FrameSet;
use super::plan::{self, ClampPolicy, FrameStep, PlannedSample};

/// Default frame delta used for finite differences of time mappings.
pub const DEFAULT_DERIVATIVE_STEP: Frame = 0.25;

/// Policy for requests outside the usable frame range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClampMode {
    /// Repeat the boundary frame.
    #[default]
    Hold,
    /// Produce an empty result.
    Blank,
}

impl std::str::FromStr for ClampMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hold" => Ok(Self::Hold),
            "blank" => Ok(Self::Blank),
            other => Err(Error::config(format!("unknown clamp mode \"{other}\""))),
        }
    }
}

/// Where a requested time falls relative to the usable frame range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RangeRegion {
    Before,
    Inside,
    After,
}

/// Inclusive custom frame range of a sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    /// Create a range, rejecting `end < start`.
    pub fn new(start: Frame, end: Frame) -> Result<Self> {
        if end < start {
            return Err(Error::config(format!(
                "range end ({end}) must not be before range start ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Check if `frame` lies within the range.
    #[inline]
    pub fn contains(&self, frame: Frame) -> bool {
        frame >= self.start && frame <= self.end
    }
}

/// Externally evaluated time remapping.
///
/// The mapping is arbitrary; it does not have to be monotonic.
pub trait PlaybackGraph {
    fn evaluate(&self, frame: Frame) -> Result<Frame>;
}

impl<F> PlaybackGraph for F
where
    F: Fn(Frame) -> Frame,
{
    fn evaluate(&self, frame: Frame) -> Result<Frame> {
        Ok(self(frame))
    }
}

/// Timing configuration of one sequence evaluation.
#[derive(Clone, Copy, Default)]
pub struct Timing<'g> {
    offset: Frame,
    range: Option<FrameRange>,
    playback_graph: Option<&'g dyn PlaybackGraph>,
}

impl<'g> Timing<'g> {
    /// Identity timing: no offset, no range, no graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frame offset added to every output frame.
    pub fn with_offset(mut self, offset: Frame) -> Self {
        self.offset = offset;
        self
    }

    /// Restrict the usable frames to a custom range.
    pub fn with_range(mut self, range: FrameRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Remap source time through a playback graph.
    pub fn with_playback_graph(mut self, graph: &'g dyn PlaybackGraph) -> Self {
        self.playback_graph = Some(graph);
        self
    }

    /// Frame offset.
    #[inline]
    pub fn offset(&self) -> Frame {
        self.offset
    }

    /// Custom range, if any.
    #[inline]
    pub fn range(&self) -> Option<FrameRange> {
        self.range
    }

    /// True when a playback graph is attached.
    #[inline]
    pub fn has_playback_graph(&self) -> bool {
        self.playback_graph.is_some()
    }

    /// Map an output frame to the nominal source frame.
    ///
    /// The custom range is not applied here; the planner classifies the
    /// result against it.
    pub fn resolve(&self, output_frame: Frame) -> Result<Frame> {
        let frame = output_frame + self.offset;
        match self.playback_graph {
            Some(graph) => graph.evaluate(frame),
            None => Ok(frame),
        }
    }

    /// Local derivative of source time with respect to output time.
    ///
    /// Central difference over `step` frames; exactly 1 without a graph.
    pub fn time_derivative(&self, output_frame: Frame, step: Frame) -> Result<f64> {
        if self.playback_graph.is_none() {
            return Ok(1.0);
        }
        if step <= 0.0 {
            return Err(Error::config("time derivative step must be positive"));
        }
        let before = self.resolve(output_frame - step * 0.5)?;
        let after = self.resolve(output_frame + step * 0.5)?;
        Ok((after - before) / step)
    }

    /// Resolve `output_frame` and plan a velocity-offset sample.
    pub fn plan_offset(
        &self,
        output_frame: Frame,
        frames: &dyn FrameSet,
        step: FrameStep,
        clamp: ClampPolicy,
    ) -> Result<PlannedSample> {
        let source = self.resolve(output_frame)?;
        plan::plan_offset(source, frames, self.range, step, clamp)
    }

    /// Resolve `output_frame` and plan a two-frame interpolation bracket.
    pub fn plan_bracket(
        &self,
        output_frame: Frame,
        frames: &dyn FrameSet,
        step: FrameStep,
        clamp: ClampPolicy,
    ) -> Result<PlannedSample> {
        let source = self.resolve(output_frame)?;
        plan::plan_bracket(source, frames, self.range, step, clamp)
    }
}

impl std::fmt::Debug for Timing<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timing")
            .field("offset", &self.offset)
            .field("range", &self.range)
            .field("playback_graph", &self.playback_graph.is_some())
            .finish()
    }
}
