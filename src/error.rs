//! Failure taxonomy for the overlay player.
//!
//! None of these are fatal. Fetch-level failures become explicit view states,
//! per-frame failures become a banner while playback keeps running.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    /// Frame list or detection list retrieval failed (network or parse).
    #[error("failed to load video data: {0}")]
    DataFetch(String),

    /// Retrieval succeeded but produced zero frames.
    #[error("no frames available for video {video_id}")]
    EmptyDataset { video_id: u64 },

    /// A frame image could not be fetched or decoded after both attempts.
    #[error("failed to load image for frame {frame_number}: {reason}")]
    ImageLoad { frame_number: u64, reason: String },

    /// A detection carried non-finite or inverted coordinates.
    #[error("detection on frame {frame_number} has invalid geometry")]
    InvalidDetectionGeometry { frame_number: u64 },
}

impl PlayerError {
    /// Whether playback may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlayerError::ImageLoad { .. } | PlayerError::InvalidDetectionGeometry { .. }
        )
    }
}
