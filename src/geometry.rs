//! Native image space → canvas space.

use crate::detect::BoundingBox;

pub const MIN_LABEL_FONT_PX: f32 = 10.0;
pub const MAX_LABEL_FONT_PX: f32 = 14.0;
const FONT_WIDTH_DIVISOR: f32 = 60.0;

/// On-screen rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Display size of one frame and the scale from native pixels to it.
///
/// Recomputed on every draw; never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayGeometry {
    pub natural_width: u32,
    pub natural_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl DisplayGeometry {
    /// Fit an image into `container_width`, preserving aspect ratio and never
    /// upscaling past the natural width. Returns `None` for degenerate input.
    pub fn fit(natural_width: u32, natural_height: u32, container_width: u32) -> Option<Self> {
        if natural_width == 0 || natural_height == 0 || container_width == 0 {
            return None;
        }
        let display_width = natural_width.min(container_width);
        let aspect = natural_width as f64 / natural_height as f64;
        let display_height = ((display_width as f64 / aspect).round() as u32).max(1);
        Some(Self {
            natural_width,
            natural_height,
            display_width,
            display_height,
            scale_x: display_width as f32 / natural_width as f32,
            scale_y: display_height as f32 / natural_height as f32,
        })
    }

    pub fn scale(&self) -> Scale {
        Scale {
            x: self.scale_x,
            y: self.scale_y,
        }
    }

    /// Label font size for this display width.
    pub fn label_font_size(&self) -> f32 {
        label_font_size(self.display_width)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

/// Map a native bounding box onto the canvas.
pub fn map_box(bbox: &BoundingBox, scale: Scale) -> ScreenRect {
    ScreenRect {
        x: bbox.x1 * scale.x,
        y: bbox.y1 * scale.y,
        width: (bbox.x2 - bbox.x1) * scale.x,
        height: (bbox.y2 - bbox.y1) * scale.y,
    }
}

/// Inverse of [`map_box`].
pub fn unmap_rect(rect: &ScreenRect, scale: Scale) -> BoundingBox {
    BoundingBox {
        x1: rect.x / scale.x,
        y1: rect.y / scale.y,
        x2: (rect.x + rect.width) / scale.x,
        y2: (rect.y + rect.height) / scale.y,
    }
}

/// `display_width / 60`, clamped to `[10, 14]` px.
pub fn label_font_size(display_width: u32) -> f32 {
    (display_width as f32 / FONT_WIDTH_DIVISOR).clamp(MIN_LABEL_FONT_PX, MAX_LABEL_FONT_PX)
}
