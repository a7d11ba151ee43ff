use anyhow::Result;

use crate::detect::DetectionList;
use crate::frame::{Frame, FrameList};

/// How a frame image should be requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRequest {
    /// Carry the interstitial bypass header (first attempt).
    Bypass,
    /// Plain request for the raw asset URL (fallback).
    Plain,
}

/// Backend operations the overlay player consumes.
///
/// # Boundary
///
/// Implementations own transport policy (timeouts, TLS, retries). The player
/// only reacts to success or failure and never retries on its own beyond the
/// bypass → plain image fallback.
pub trait VideoBackend: Send + Sync {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Ordered frame list plus suggested playback rate.
    fn video_frames(&self, video_id: u64) -> Result<FrameList>;

    /// Every detection for the video, unordered.
    fn video_detections(&self, video_id: u64) -> Result<DetectionList>;

    /// Encoded image bytes for one frame.
    fn frame_image(&self, frame: &Frame, request: ImageRequest) -> Result<Vec<u8>>;
}
