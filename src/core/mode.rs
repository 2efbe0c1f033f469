//! Loading modes of a mesh sequence.

use crate::util::{Error, Result};

use super::plan::FrameStep;

/// How a sequence turns an output time into mesh data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingMode {
    /// One file, independent of time.
    Static,
    /// Nothing is loaded.
    Blank,
    /// Nearest whole frame, displaced along its velocity channel.
    #[default]
    VelocityOffset,
    /// Containing subframe, displaced along its velocity channel.
    SubframeVelocityOffset,
    /// Blend of the two whole frames around the requested time.
    FrameInterpolation,
    /// Blend of the two subframes around the requested time.
    SubframeInterpolation,
}

impl LoadingMode {
    /// All modes in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Static,
        Self::Blank,
        Self::VelocityOffset,
        Self::SubframeVelocityOffset,
        Self::FrameInterpolation,
        Self::SubframeInterpolation,
    ];

    /// Check if this mode extrapolates along velocities.
    #[inline]
    pub fn is_velocity(self) -> bool {
        matches!(self, Self::VelocityOffset | Self::SubframeVelocityOffset)
    }

    /// Check if this mode blends two frames.
    #[inline]
    pub fn is_interpolation(self) -> bool {
        matches!(self, Self::FrameInterpolation | Self::SubframeInterpolation)
    }

    /// Frame granularity used by the planner.
    pub fn frame_step(self) -> FrameStep {
        match self {
            Self::SubframeVelocityOffset | Self::SubframeInterpolation => FrameStep::Subframe,
            _ => FrameStep::Whole,
        }
    }

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Blank => "blank",
            Self::VelocityOffset => "velocity_offset",
            Self::SubframeVelocityOffset => "subframe_velocity_offset",
            Self::FrameInterpolation => "frame_interpolation",
            Self::SubframeInterpolation => "subframe_interpolation",
        }
    }
}

impl std::fmt::Display for LoadingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoadingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| Error::config(format!("unknown loading mode \"{s}\"")))
    }
}
