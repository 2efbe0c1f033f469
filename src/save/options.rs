//! Options of the mesh export commands.

use std::path::PathBuf;

use crate::geom::{LengthUnit, MATERIAL_ID_CHANNEL, VELOCITY_CHANNEL};
use crate::material::MaterialIdMap;
use crate::util::{Error, Frame, Result};

/// File extension accepted for exported meshes.
pub const XMESH_EXTENSION: &str = "xmesh";

/// Channel names accepted in a channel list, besides `Mapping2`..`Mapping99`.
pub const KNOWN_CHANNELS: [&str; 8] = [
    VELOCITY_CHANNEL,
    MATERIAL_ID_CHANNEL,
    "SmoothingGroup",
    "Color",
    "TextureCoord",
    "Normal",
    "EdgeSharpness",
    "VertexSharpness",
];

/// Check every channel name, reporting the first unknown one.
pub fn validate_channels<S: AsRef<str>>(channels: &[S]) -> Result<()> {
    for channel in channels {
        let channel = channel.as_ref();
        if !KNOWN_CHANNELS.contains(&channel) && !is_mapping_channel(channel) {
            return Err(Error::config(format!("unknown channel \"{channel}\"")));
        }
    }
    Ok(())
}

/// `Mapping2` through `Mapping99`.
fn is_mapping_channel(channel: &str) -> bool {
    let Some(n) = channel.strip_prefix("Mapping") else {
        return false;
    };
    !n.starts_with('0') && n.len() <= 2 && n.parse::<u8>().is_ok_and(|n| (2..=99).contains(&n))
}

/// Parse a comma separated channel list, trimming each entry.
pub fn parse_channel_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// Options of a mesh export.
#[derive(Clone, Debug)]
pub struct SaveOptions {
    /// Output filename patterns, one per exported mesh.
    pub paths: Vec<PathBuf>,
    /// Export positions in world space.
    pub world_space: bool,
    /// Channels to export.
    pub channels: Vec<String>,
    /// First and last frame; the scene playback range when unset.
    pub frame_range: Option<(Frame, Frame)>,
    /// Frame step; 1 when unset.
    pub step: Option<Frame>,
    /// Skip hidden objects.
    pub visible_only: bool,
    /// Objects combined into each output; the selection when empty.
    pub objects: Vec<Vec<String>>,
    /// Material ID map per output; fresh maps when empty.
    pub material_maps: Vec<MaterialIdMap>,
    /// Length unit stored in the metadata.
    pub length_unit: Option<(f64, LengthUnit)>,
    /// Export vertices only (single-frame export).
    pub verts_only: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            world_space: false,
            channels: vec![VELOCITY_CHANNEL.to_string(), MATERIAL_ID_CHANNEL.to_string()],
            frame_range: None,
            step: None,
            visible_only: false,
            objects: Vec::new(),
            material_maps: Vec::new(),
            length_unit: None,
            verts_only: false,
        }
    }
}

impl SaveOptions {
    /// Options exporting to the given patterns.
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self { paths: paths.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    /// Check if `channel` is exported.
    pub fn includes_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    /// Effective frame step.
    pub fn step(&self) -> Frame {
        self.step.unwrap_or(1.0)
    }

    /// Check the options before any work begins.
    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(Error::config("must specify a path to save to"));
        }
        for path in &self.paths {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if !ext.eq_ignore_ascii_case(XMESH_EXTENSION) {
                return Err(Error::config(format!(
                    "unrecognized extension \"{ext}\" in path {}, valid extensions are: .{XMESH_EXTENSION}",
                    path.display()
                )));
            }
        }
        if let Some((start, end)) = self.frame_range {
            if end < start {
                return Err(Error::config(format!(
                    "start frame ({start}) must be less than or equal to end frame ({end})"
                )));
            }
        }
        if !(self.step() > 0.0) {
            return Err(Error::config("step must be a positive number"));
        }
        if !self.material_maps.is_empty() && self.material_maps.len() != self.paths.len() {
            return Err(Error::config(format!(
                "mismatch between number of paths ({}) and number of material ID maps ({})",
                self.paths.len(),
                self.material_maps.len()
            )));
        }
        if self.objects.is_empty() {
            if self.paths.len() > 1 {
                return Err(Error::config("more than one path specified, but no objects were specified"));
            }
        } else if self.objects.len() != self.paths.len() {
            return Err(Error::config(format!(
                "mismatch between number of paths ({}) and number of object lists ({})",
                self.paths.len(),
                self.objects.len()
            )));
        }
        validate_channels(&self.channels)
    }
}

/// Frames to export: `start`, `start + step`, ... up to `end`, with `end`
/// appended when the steps miss it.
pub fn sample_times(start: Frame, end: Frame, step: Frame) -> Vec<Frame> {
    const EPS: Frame = 1e-9;
    let mut times = Vec::new();
    if step > 0.0 {
        let mut i = 0u64;
        loop {
            let t = start + step * i as Frame;
            if t > end + EPS {
                break;
            }
            times.push(if (t - end).abs() <= EPS { end } else { t });
            i += 1;
        }
    }
    if times.last() != Some(&end) {
        times.push(end);
    }
    times
}
