//! Core layer - the timing and sampling engine.
//!
//! This module provides:
//! - [`FrameSet`] / [`SortedFrameSet`] - Frames available on disk
//! - [`Timing`] - Output time to source time mapping
//! - [`plan_offset`] / [`plan_bracket`] - Which frames to load for a time
//! - [`LoadingMode`] - How a sequence is sampled
//! - [`MeshCache`] - One-generation cache of loaded meshes

mod cache;
mod frame_set;
mod mode;
mod plan;
mod timing;

pub use cache::{CacheEntry, CacheKey, MeshCache, SampleKey};
pub use frame_set::{FrameSet, SortedFrameSet};
pub use mode::LoadingMode;
pub use plan::{plan_bracket, plan_offset, ClampPolicy, FrameStep, PlannedSample, SamplePlan};
pub use timing::{
    ClampMode, FrameRange, PlaybackGraph, RangeRegion, Timing, DEFAULT_DERIVATIVE_STEP,
};
