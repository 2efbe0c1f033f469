//! Persistent sequence loader settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{ClampMode, ClampPolicy, FrameRange, LoadingMode, PlaybackGraph, Timing};
use crate::geom::LoadMask;
use crate::sequence::FilenamePattern;
use crate::util::{Error, Frame, Result};

/// How the loaded sequence is displayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Full mesh.
    #[default]
    Mesh,
    /// Bounding box only.
    Box,
    /// Vertices only.
    Vertex,
    /// A fraction of the faces.
    Face,
}

impl DisplayMode {
    /// Parts of the file needed for this display mode.
    pub fn load_mask(self) -> LoadMask {
        match self {
            Self::Mesh | Self::Face => LoadMask::STATIC_MESH,
            Self::Box => LoadMask::BOX,
            Self::Vertex => LoadMask::VERTS,
        }
    }
}

/// Which of the two sequences feeds an output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceSource {
    #[default]
    Render,
    Proxy,
}

/// Settings of one mesh sequence, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    // Sequences
    pub render_path: PathBuf,
    pub proxy_path: PathBuf,
    pub auto_proxy: bool,

    // Timing
    pub loading_mode: LoadingMode,
    pub frame_offset: Frame,
    pub use_custom_range: bool,
    pub range_start: Frame,
    pub range_end: Frame,
    pub start_clamp: ClampMode,
    pub end_clamp: ClampMode,
    pub use_playback_graph: bool,

    // Display
    pub viewport_source: SequenceSource,
    pub render_source: SequenceSource,
    pub display_mode: DisplayMode,
    pub display_percent: f32, // 0-100
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            render_path: PathBuf::new(),
            proxy_path: PathBuf::new(),
            auto_proxy: true,
            loading_mode: LoadingMode::VelocityOffset,
            frame_offset: 0.0,
            use_custom_range: false,
            range_start: 0.0,
            range_end: 100.0,
            start_clamp: ClampMode::Hold,
            end_clamp: ClampMode::Hold,
            use_playback_graph: false,
            viewport_source: SequenceSource::Render,
            render_source: SequenceSource::Render,
            display_mode: DisplayMode::Mesh,
            display_percent: 100.0,
        }
    }
}

impl LoaderSettings {
    /// Settings for the sequence at `path` with everything else default.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self { render_path: path.into(), ..Self::default() }
    }

    /// Load and validate settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check the settings for contradictions.
    pub fn validate(&self) -> Result<()> {
        if self.use_custom_range && self.range_end < self.range_start {
            return Err(Error::config(format!(
                "range end ({}) must not be before range start ({})",
                self.range_end, self.range_start
            )));
        }
        if !(0.0..=100.0).contains(&self.display_percent) {
            return Err(Error::config(format!(
                "display percent {} is outside 0..=100",
                self.display_percent
            )));
        }
        if !self.frame_offset.is_finite() {
            return Err(Error::config("frame offset must be finite"));
        }
        Ok(())
    }

    /// Clamp modes of the custom range.
    pub fn clamp_policy(&self) -> ClampPolicy {
        ClampPolicy { start: self.start_clamp, end: self.end_clamp }
    }

    /// Custom range, if enabled.
    pub fn custom_range(&self) -> Result<Option<FrameRange>> {
        if self.use_custom_range {
            FrameRange::new(self.range_start, self.range_end).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Timing configuration, remapped through `graph` when enabled.
    pub fn timing<'g>(&self, graph: Option<&'g dyn PlaybackGraph>) -> Result<Timing<'g>> {
        let mut timing = Timing::new().with_offset(self.frame_offset);
        if let Some(range) = self.custom_range()? {
            timing = timing.with_range(range);
        }
        if self.use_playback_graph {
            let graph = graph.ok_or_else(|| Error::config("playback graph enabled but not connected"))?;
            timing = timing.with_playback_graph(graph);
        }
        Ok(timing)
    }

    /// Display mode in effect; rendering always shows the full mesh.
    pub fn effective_display_mode(&self, rendering: bool) -> DisplayMode {
        if rendering {
            DisplayMode::Mesh
        } else {
            self.display_mode
        }
    }

    /// Fraction of faces shown in face display mode.
    pub fn display_fraction(&self) -> f32 {
        (self.display_percent / 100.0).clamp(0.0, 1.0)
    }

    /// Source feeding the viewport or the renderer.
    pub fn active_source(&self, rendering: bool) -> SequenceSource {
        if rendering {
            self.render_source
        } else {
            self.viewport_source
        }
    }

    /// Path of the sequence selected by `source`. Empty when unset.
    pub fn sequence_path(&self, source: SequenceSource) -> Result<PathBuf> {
        match source {
            SequenceSource::Render => Ok(self.render_path.clone()),
            SequenceSource::Proxy if self.auto_proxy => {
                if self.render_path.as_os_str().is_empty() {
                    return Ok(PathBuf::new());
                }
                Ok(FilenamePattern::parse(&self.render_path)?.auto_proxy().hashed_path())
            }
            SequenceSource::Proxy => Ok(self.proxy_path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = LoaderSettings::default();
        assert_eq!(s.loading_mode, LoadingMode::VelocityOffset);
        assert!(s.auto_proxy);
        assert_eq!(s.display_fraction(), 1.0);
        assert!(s.custom_range().unwrap().is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut s = LoaderSettings { use_custom_range: true, range_start: 10.0, range_end: 5.0, ..Default::default() };
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
        s.range_end = 20.0;
        assert!(s.validate().is_ok());
        s.display_percent = 150.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_display_masks() {
        assert_eq!(DisplayMode::Face.load_mask(), LoadMask::STATIC_MESH);
        assert_eq!(DisplayMode::Box.load_mask(), LoadMask::BOX);
        assert_eq!(DisplayMode::Vertex.load_mask(), LoadMask::VERTS);

        let s = LoaderSettings { display_mode: DisplayMode::Box, ..Default::default() };
        assert_eq!(s.effective_display_mode(true), DisplayMode::Mesh);
        assert_eq!(s.effective_display_mode(false), DisplayMode::Box);
    }

    #[test]
    fn test_sequence_paths() {
        let mut s = LoaderSettings::for_path("/cache/a_0001.xmesh");
        s.proxy_path = PathBuf::from("/low/a_####.xmesh");
        assert_eq!(s.sequence_path(SequenceSource::Render).unwrap(), PathBuf::from("/cache/a_0001.xmesh"));
        assert_eq!(
            s.sequence_path(SequenceSource::Proxy).unwrap(),
            PathBuf::from("/cache/a__proxy/a__proxy####.xmesh")
        );
        s.auto_proxy = false;
        assert_eq!(s.sequence_path(SequenceSource::Proxy).unwrap(), PathBuf::from("/low/a_####.xmesh"));

        let empty = LoaderSettings::default();
        assert!(empty.sequence_path(SequenceSource::Proxy).unwrap().as_os_str().is_empty());
    }

    #[test]
    fn test_timing_requires_graph() {
        let s = LoaderSettings { use_playback_graph: true, frame_offset: 2.0, ..Default::default() };
        assert!(s.timing(None).is_err());
        let graph = |f: Frame| f * 2.0;
        let timing = s.timing(Some(&graph as &dyn PlaybackGraph)).unwrap();
        assert_eq!(timing.resolve(3.0).unwrap(), 10.0);
    }

    #[test]
    fn test_json_round_trip_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let s = LoaderSettings {
            loading_mode: LoadingMode::SubframeInterpolation,
            start_clamp: ClampMode::Blank,
            ..LoaderSettings::for_path("seq_####.xmesh")
        };
        s.save(&path).unwrap();
        assert_eq!(LoaderSettings::load(&path).unwrap(), s);

        std::fs::write(&path, r#"{ "loading_mode": "frame_interpolation" }"#).unwrap();
        let partial = LoaderSettings::load(&path).unwrap();
        assert_eq!(partial.loading_mode, LoadingMode::FrameInterpolation);
        assert_eq!(partial.range_end, 100.0);
    }
}
