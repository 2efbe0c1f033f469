//! Numbered file sequences on disk.
//!
//! - [`FilenamePattern`] - Frame number encoding in file names
//! - [`FilenameSequence`] - Pattern plus the frames found by a directory scan

mod pattern;
mod scan;

pub use pattern::FilenamePattern;
pub use scan::FilenameSequence;
