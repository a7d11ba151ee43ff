//! Frame + overlay drawing.

mod image_loader;
mod overlay;
mod surface;

pub use image_loader::load_frame_image;
pub use overlay::{
    layout_label, DecodedFrame, DrawReport, LabelLayout, LabelPlacement, OverlayRenderer,
    STROKE_WIDTH,
};
pub use surface::{load_font, DrawOp, RasterSurface, RecordingSurface, Surface};
