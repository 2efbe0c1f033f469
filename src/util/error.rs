//! Error types for the xmesh library.

use std::path::PathBuf;
use thiserror::Error;

use super::Frame;

/// Main error type for xmesh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A sample was required but the sequence has no frames on disk.
    #[error("The frame set of the sequence is empty")]
    EmptyFrameSet,

    /// A frame required by a sample plan is not part of the sequence.
    #[error("Frame {frame} does not exist in sequence {path}")]
    FrameNotFound { path: PathBuf, frame: Frame },

    /// File or directory does not exist or cannot be accessed.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Two meshes do not share vertex count and face structure.
    #[error("Topology mismatch: {0}")]
    TopologyMismatch(String),

    /// A channel does not match the geometry it belongs to.
    #[error("Channel \"{channel}\" has {actual} entries, expected {expected}")]
    ChannelMismatch {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid user configuration, detected before any work begins.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The playback graph could not be evaluated.
    #[error("Unable to evaluate playback graph at frame {frame}: {reason}")]
    PlaybackGraph { frame: Frame, reason: String },

    /// The filename does not contain a usable sequence number.
    #[error("Invalid filename pattern: {0}")]
    InvalidPattern(String),

    /// No unused material ID is left.
    #[error("Exhausted available material IDs")]
    MaterialIdsExhausted,

    /// The host scene reported a failure.
    #[error("Scene error: {0}")]
    Scene(String),

    /// A long-running operation was cancelled by the user.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (settings) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a topology mismatch error.
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::TopologyMismatch(msg.into())
    }

    /// True for the cancellation condition, which is not a failure.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for xmesh operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::FrameNotFound { path: PathBuf::from("seq_####.xmesh"), frame: 12.0 };
        assert!(e.to_string().contains("12"));
        assert!(e.to_string().contains("seq_####.xmesh"));

        let e = Error::ChannelMismatch { channel: "Velocity", expected: 8, actual: 4 };
        assert!(e.to_string().contains("Velocity"));
        assert!(e.to_string().contains('8'));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_cancelled_is_distinct() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::EmptyFrameSet.is_cancelled());
        assert!(!Error::other("boom").is_cancelled());
    }
}
