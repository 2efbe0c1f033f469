//! Discovery of the frames of a sequence on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{FrameSet, SortedFrameSet};
use crate::util::{Error, Frame, Result};

use super::pattern::FilenamePattern;

/// A filename pattern and the frames found for it.
#[derive(Clone, Debug, PartialEq)]
pub struct FilenameSequence {
    pattern: FilenamePattern,
    frames: SortedFrameSet,
}

impl FilenameSequence {
    /// Sequence with no frames discovered yet.
    pub fn new(pattern: FilenamePattern) -> Self {
        Self { pattern, frames: SortedFrameSet::new() }
    }

    /// Parse `path` and scan its directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut seq = Self::new(FilenamePattern::parse(path)?);
        seq.sync_frame_set()?;
        Ok(seq)
    }

    /// Rebuild the frame set from the directory contents.
    pub fn sync_frame_set(&mut self) -> Result<()> {
        let dir = self.pattern.scan_dir();
        if !dir.is_dir() {
            return Err(Error::NotFound(dir.to_path_buf()));
        }

        self.frames.clear();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(frame) = name.to_str().and_then(|n| self.pattern.frame_of(n)) {
                self.frames.insert(frame);
            }
        }

        tracing::debug!(
            pattern = %self.pattern,
            count = self.frames.len(),
            "scanned sequence frames"
        );
        Ok(())
    }

    /// The filename pattern.
    pub fn pattern(&self) -> &FilenamePattern {
        &self.pattern
    }

    /// Frames found by the last scan.
    pub fn frames(&self) -> &SortedFrameSet {
        &self.frames
    }

    /// Path of the file holding `frame`.
    pub fn file_for(&self, frame: Frame) -> PathBuf {
        self.pattern.filename_for(frame)
    }

    /// Smallest available whole frame index, 0 when empty.
    pub fn min_frame_index(&self) -> i64 {
        self.frames.min().map_or(0, |f| f.ceil() as i64)
    }

    /// Largest available whole frame index, 0 when empty.
    pub fn max_frame_index(&self) -> i64 {
        self.frames.max().map_or(0, |f| f.floor() as i64)
    }
}
