//! Extracted video frames as served by the backend.
//!
//! The backend's extraction pipeline produces one still per sampled position
//! and serves it as an image asset under the backend origin. A `Frame` only
//! carries the locator; pixels are fetched per draw by the renderer.

use serde::Deserialize;
use serde_json::Value;

/// Playback rate used when the backend does not suggest one.
pub const DEFAULT_PLAYBACK_FPS: f64 = 2.0;

/// One extracted still.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Frame {
    pub frame_number: u64,
    /// Path relative to the backend origin, e.g. `/static/frames/12/000034.jpg`.
    pub url: String,
}

/// Normalized `/videos/{id}/frames` response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameList {
    /// Ascending by `frame_number`, no duplicates.
    pub frames: Vec<Frame>,
    /// Backend-suggested playback rate, if it sent a usable one.
    pub playback_fps: Option<f64>,
}

impl FrameList {
    /// Normalize a response body.
    ///
    /// A missing or non-array `frames` field yields no frames. Malformed entries
    /// are dropped. Frames are re-sorted and deduplicated by `frame_number`.
    pub fn from_value(body: Value) -> Self {
        let playback_fps = body
            .get("playback_fps")
            .and_then(Value::as_f64)
            .filter(|fps| fps.is_finite() && *fps > 0.0);

        let mut frames: Vec<Frame> = match body.get("frames") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| match Frame::deserialize(entry) {
                    Ok(frame) => Some(frame),
                    Err(err) => {
                        log::debug!("dropping malformed frame entry: {}", err);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        frames.sort_by_key(|frame| frame.frame_number);
        let before = frames.len();
        frames.dedup_by_key(|frame| frame.frame_number);
        if frames.len() != before {
            log::warn!(
                "frame list contained {} duplicate frame numbers",
                before - frames.len()
            );
        }

        Self {
            frames,
            playback_fps,
        }
    }

    /// Suggested rate or `fallback`.
    pub fn fps_or(&self, fallback: f64) -> f64 {
        self.playback_fps.unwrap_or(fallback)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
