use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::geometry::ScreenRect;

/// Average glyph advance as a fraction of the font size, used when no font is loaded.
const FALLBACK_ADVANCE: f32 = 0.6;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// 2D drawing target, modelled on a canvas context.
///
/// Coordinates are canvas pixels. Text is positioned by its top-left corner.
pub trait Surface {
    /// Resize and clear.
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// Draw `image` scaled to `width`×`height` at the origin.
    fn draw_image(&mut self, image: &RgbaImage, width: u32, height: u32);

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba<u8>, line_width: u32);

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba<u8>);

    /// Rendered width of `text` at `font_size` px.
    fn measure_text(&self, text: &str, font_size: f32) -> f32;

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Rgba<u8>);

    /// Called once a frame is complete.
    fn present(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory RGBA raster.
pub struct RasterSurface {
    canvas: RgbaImage,
    font: Option<FontVec>,
    snapshot_path: Option<PathBuf>,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self {
            canvas: RgbaImage::new(0, 0),
            font: None,
            snapshot_path: None,
        }
    }

    pub fn with_font(mut self, font: FontVec) -> Self {
        self.font = Some(font);
        self
    }

    /// Write a PNG to `path` on every `present`.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Use `configured` if given, otherwise the first common system font found.
    /// Without a font, label backgrounds are still drawn but glyphs are not.
    pub fn with_discovered_font(self, configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            return Ok(self.with_font(load_font(path)?));
        }
        for candidate in FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match load_font(path) {
                Ok(font) => {
                    log::debug!("label font: {}", path.display());
                    return Ok(self.with_font(font));
                }
                Err(err) => log::debug!("skipping font {}: {:#}", path.display(), err),
            }
        }
        log::warn!("no label font found; set SENTRY_FONT_PATH to render label text");
        Ok(self)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        if self.canvas.width() == 0 || self.canvas.height() == 0 {
            return Err(anyhow!("nothing drawn yet"));
        }
        self.canvas
            .save(path)
            .with_context(|| format!("write frame snapshot {}", path.display()))
    }
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_font(path: &Path) -> Result<FontVec> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read font file {}", path.display()))?;
    FontVec::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))
}

/// Slack kept around the canvas when clipping, so clipped edges stay off-canvas.
const CLIP_MARGIN: f32 = 4.0;

/// Clip `rect` to the canvas grown by `CLIP_MARGIN`, then snap to whole pixels.
fn to_pixel_rect(rect: ScreenRect, (canvas_w, canvas_h): (u32, u32)) -> Option<Rect> {
    let values = [rect.x, rect.y, rect.width, rect.height];
    if !values.iter().all(|v| v.is_finite()) {
        return None;
    }
    let left = rect.x.max(-CLIP_MARGIN);
    let top = rect.y.max(-CLIP_MARGIN);
    let right = (rect.x + rect.width).min(canvas_w as f32 + CLIP_MARGIN);
    let bottom = (rect.y + rect.height).min(canvas_h as f32 + CLIP_MARGIN);
    let width = (right - left).round();
    let height = (bottom - top).round();
    if !(width >= 1.0 && height >= 1.0) {
        return None;
    }
    let origin = Rect::at(left.floor() as i32, top.floor() as i32);
    Some(origin.of_size(width as u32, height as u32))
}

impl Surface for RasterSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.canvas = RgbaImage::new(width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn draw_image(&mut self, image: &RgbaImage, width: u32, height: u32) {
        if image.dimensions() == (width, height) {
            imageops::replace(&mut self.canvas, image, 0, 0);
        } else {
            let scaled = imageops::resize(image, width, height, FilterType::Triangle);
            imageops::replace(&mut self.canvas, &scaled, 0, 0);
        }
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba<u8>, line_width: u32) {
        // Canvas strokes straddle the path; grow/shrink one pixel per pass.
        let half = (line_width / 2) as f32;
        for pass in 0..line_width.max(1) {
            let d = half - pass as f32;
            let ring = ScreenRect::new(
                rect.x - d,
                rect.y - d,
                rect.width + 2.0 * d,
                rect.height + 2.0 * d,
            );
            if let Some(r) = to_pixel_rect(ring, self.canvas.dimensions()) {
                draw_hollow_rect_mut(&mut self.canvas, r, color);
            }
        }
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba<u8>) {
        if let Some(r) = to_pixel_rect(rect, self.canvas.dimensions()) {
            draw_filled_rect_mut(&mut self.canvas, r, color);
        }
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        match &self.font {
            Some(font) => text_size(PxScale::from(font_size), font, text).0 as f32,
            None => text.chars().count() as f32 * font_size * FALLBACK_ADVANCE,
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Rgba<u8>) {
        if let Some(font) = &self.font {
            draw_text_mut(
                &mut self.canvas,
                color,
                x.round() as i32,
                y.round() as i32,
                PxScale::from(font_size),
                font,
                text,
            );
        }
    }

    fn present(&mut self) -> Result<()> {
        match &self.snapshot_path {
            Some(path) => self.save_png(path),
            None => Ok(()),
        }
    }
}

/// One recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Resize { width: u32, height: u32 },
    Image { width: u32, height: u32 },
    StrokeRect { rect: ScreenRect, color: Rgba<u8>, line_width: u32 },
    FillRect { rect: ScreenRect, color: Rgba<u8> },
    Text { text: String, x: f32, y: f32, font_size: f32, color: Rgba<u8> },
    Present,
}

/// Surface that records calls instead of rasterizing; `resize` clears the log.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    size: (u32, u32),
    ops: Vec<DrawOp>,
    presents: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls since the last resize.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn labels(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn boxes(&self) -> Vec<ScreenRect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokeRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    /// Total `present` calls over the surface's lifetime.
    pub fn presents(&self) -> usize {
        self.presents
    }
}

impl Surface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.ops.clear();
        self.ops.push(DrawOp::Resize { width, height });
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw_image(&mut self, _image: &RgbaImage, width: u32, height: u32) {
        self.ops.push(DrawOp::Image { width, height });
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba<u8>, line_width: u32) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba<u8>) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * FALLBACK_ADVANCE
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Rgba<u8>) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            font_size,
            color,
        });
    }

    fn present(&mut self) -> Result<()> {
        self.presents += 1;
        self.ops.push(DrawOp::Present);
        Ok(())
    }
}
