use anyhow::{Context, Result};

use super::overlay::DecodedFrame;
use crate::api::{ImageRequest, VideoBackend};
use crate::error::PlayerError;
use crate::frame::Frame;

/// Fetch and decode one frame image.
///
/// The first attempt carries the tunnel bypass header. If it fails to fetch or
/// decode (an interstitial page is not an image), the raw URL is requested
/// plainly. Only when both attempts fail is an `ImageLoad` error returned.
pub fn load_frame_image(
    backend: &dyn VideoBackend,
    frame: &Frame,
) -> Result<DecodedFrame, PlayerError> {
    let first = fetch_and_decode(backend, frame, ImageRequest::Bypass);
    let first_err = match first {
        Ok(decoded) => return Ok(decoded),
        Err(err) => err,
    };
    log::debug!(
        "frame {}: bypass fetch failed ({:#}); retrying plain",
        frame.frame_number,
        first_err
    );

    fetch_and_decode(backend, frame, ImageRequest::Plain).map_err(|second_err| {
        PlayerError::ImageLoad {
            frame_number: frame.frame_number,
            reason: format!("{:#}; fallback: {:#}", first_err, second_err),
        }
    })
}

fn fetch_and_decode(
    backend: &dyn VideoBackend,
    frame: &Frame,
    request: ImageRequest,
) -> Result<DecodedFrame> {
    let bytes = backend.frame_image(frame, request)?;
    let image = image::load_from_memory(&bytes)
        .with_context(|| format!("decode {}", frame.url))?
        .into_rgba8();
    Ok(DecodedFrame {
        frame_number: frame.frame_number,
        image,
    })
}
