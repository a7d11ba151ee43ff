use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use image::{ImageFormat, Rgba, RgbaImage};

use super::backend::{ImageRequest, VideoBackend};
use crate::detect::{Detection, DetectionList};
use crate::frame::{Frame, FrameList};

/// In-memory backend for tests and offline demos.
///
/// Serves one fixed dataset for every video id. Image bytes are real PNGs so
/// the decode path is exercised end to end.
#[derive(Default)]
pub struct StubBackend {
    frames: FrameList,
    detections: Vec<Detection>,
    images: HashMap<u64, Vec<u8>>,
    fail_frames: bool,
    fail_detections: bool,
    bypass_failures: HashSet<u64>,
    plain_failures: HashSet<u64>,
    image_requests: Mutex<Vec<(u64, ImageRequest)>>,
    frame_calls: AtomicUsize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` frames numbered from 0, each a solid `width`×`height` PNG.
    pub fn with_solid_frames(mut self, count: u64, width: u32, height: u32) -> Self {
        let mut frames = Vec::new();
        for n in 0..count {
            let shade = (n.wrapping_mul(40) % 200) as u8 + 30;
            let image = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
            self.images.insert(n, encode_png(&image));
            frames.push(Frame {
                frame_number: n,
                url: format!("/static/frames/{:05}.png", n),
            });
        }
        self.frames.frames = frames;
        self
    }

    pub fn with_playback_fps(mut self, fps: f64) -> Self {
        self.frames.playback_fps = Some(fps);
        self
    }

    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = detections;
        self
    }

    /// Replace the image bytes served for one frame (e.g. garbage to force a decode failure).
    pub fn with_image_bytes(mut self, frame_number: u64, bytes: Vec<u8>) -> Self {
        self.images.insert(frame_number, bytes);
        self
    }

    pub fn failing_frames(mut self) -> Self {
        self.fail_frames = true;
        self
    }

    pub fn failing_detections(mut self) -> Self {
        self.fail_detections = true;
        self
    }

    /// Make the bypass-header attempt fail for one frame.
    pub fn failing_bypass(mut self, frame_number: u64) -> Self {
        self.bypass_failures.insert(frame_number);
        self
    }

    /// Make the plain fallback attempt fail for one frame.
    pub fn failing_plain(mut self, frame_number: u64) -> Self {
        self.plain_failures.insert(frame_number);
        self
    }

    /// Image requests served so far, in order.
    pub fn image_requests(&self) -> Vec<(u64, ImageRequest)> {
        self.image_requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn frame_list_calls(&self) -> usize {
        self.frame_calls.load(Ordering::SeqCst)
    }
}

impl VideoBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn video_frames(&self, video_id: u64) -> Result<FrameList> {
        self.frame_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_frames {
            return Err(anyhow!("stub: frame list unavailable for video {}", video_id));
        }
        Ok(self.frames.clone())
    }

    fn video_detections(&self, video_id: u64) -> Result<DetectionList> {
        if self.fail_detections {
            return Err(anyhow!("stub: detections unavailable for video {}", video_id));
        }
        Ok(DetectionList {
            detections: self.detections.clone(),
            skipped: 0,
        })
    }

    fn frame_image(&self, frame: &Frame, request: ImageRequest) -> Result<Vec<u8>> {
        if let Ok(mut requests) = self.image_requests.lock() {
            requests.push((frame.frame_number, request));
        }
        let failing = match request {
            ImageRequest::Bypass => &self.bypass_failures,
            ImageRequest::Plain => &self.plain_failures,
        };
        if failing.contains(&frame.frame_number) {
            return Err(anyhow!(
                "stub: {:?} request failed for frame {}",
                request,
                frame.frame_number
            ));
        }
        self.images
            .get(&frame.frame_number)
            .cloned()
            .ok_or_else(|| anyhow!("stub: no image for frame {}", frame.frame_number))
    }
}

/// PNG-encode an image in memory.
pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    match image.write_to(&mut out, ImageFormat::Png) {
        Ok(()) => out.into_inner(),
        Err(err) => {
            log::error!("stub: png encode failed: {}", err);
            Vec::new()
        }
    }
}
