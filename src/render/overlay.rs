use image::RgbaImage;

use super::surface::Surface;
use crate::color::{overlay_rgba, resolve_rgb, text_rgba, DEFAULT_OVERLAY_COLOR};
use crate::detect::{Detection, DetectionIndex};
use crate::error::PlayerError;
use crate::geometry::{map_box, DisplayGeometry, ScreenRect};

pub const STROKE_WIDTH: u32 = 2;
/// Horizontal padding on each side of the label text.
const LABEL_PAD_X: f32 = 2.0;
/// Extra label height over the font size.
const LABEL_PAD_Y: f32 = 4.0;
/// Gap between the label and the top edge of its box.
const LABEL_GAP: f32 = 1.0;

/// A decoded frame image, owned for the duration of one draw.
#[derive(Debug)]
pub struct DecodedFrame {
    pub frame_number: u64,
    pub image: RgbaImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelPlacement {
    /// Directly above the box (the normal case).
    Above,
    /// Just inside the top edge of the box, when there is no room above it.
    Inside,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelLayout {
    pub background: ScreenRect,
    pub text_x: f32,
    pub text_y: f32,
    pub placement: LabelPlacement,
}

/// Place a label for `target` on a `canvas_width`×`canvas_height` canvas.
///
/// The label sits above the box. If that would cross `y = 0` it moves inside
/// the box, under the top edge. Horizontally it is shifted left as needed to
/// stay on the canvas.
pub fn layout_label(
    target: &ScreenRect,
    text_width: f32,
    font_size: f32,
    canvas_width: u32,
    canvas_height: u32,
) -> LabelLayout {
    let width = text_width + 2.0 * LABEL_PAD_X;
    let height = font_size + LABEL_PAD_Y;

    let above = target.y - height - LABEL_GAP;
    let (y, placement) = if above >= 0.0 {
        (above, LabelPlacement::Above)
    } else {
        let max_y = (canvas_height as f32 - height).max(0.0);
        (target.y.clamp(0.0, max_y), LabelPlacement::Inside)
    };

    let max_x = (canvas_width as f32 - width).max(0.0);
    let x = target.x.clamp(0.0, max_x);

    LabelLayout {
        background: ScreenRect::new(x, y, width, height),
        text_x: x + LABEL_PAD_X,
        text_y: y + LABEL_PAD_Y / 2.0,
        placement,
    }
}

/// What one draw produced.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawReport {
    pub frame_number: u64,
    pub geometry: DisplayGeometry,
    pub labels: Vec<String>,
    pub skipped: Vec<PlayerError>,
}

impl DrawReport {
    pub fn drawn(&self) -> usize {
        self.labels.len()
    }
}

/// Draws one frame and its detections onto a surface. Holds no per-frame state.
#[derive(Clone, Debug)]
pub struct OverlayRenderer {
    container_width: u32,
}

impl OverlayRenderer {
    pub fn new(container_width: u32) -> Self {
        Self {
            container_width: container_width.max(1),
        }
    }

    /// Draw `frame` and the detections indexed under its frame number.
    ///
    /// The surface is not touched when the image has no usable size, so the
    /// previous frame stays visible. `frame` is consumed and dropped here.
    pub fn draw(
        &self,
        surface: &mut dyn Surface,
        frame: DecodedFrame,
        detections: &DetectionIndex,
    ) -> Result<DrawReport, PlayerError> {
        let (natural_width, natural_height) = frame.image.dimensions();
        let geometry = DisplayGeometry::fit(natural_width, natural_height, self.container_width)
            .ok_or_else(|| PlayerError::ImageLoad {
                frame_number: frame.frame_number,
                reason: format!("image has no usable size ({}x{})", natural_width, natural_height),
            })?;

        surface.resize(geometry.display_width, geometry.display_height);
        surface.draw_image(&frame.image, geometry.display_width, geometry.display_height);

        let mut report = DrawReport {
            frame_number: frame.frame_number,
            geometry,
            labels: Vec::new(),
            skipped: Vec::new(),
        };
        for detection in detections.for_frame(frame.frame_number) {
            if !detection.bounding_box.is_valid() {
                log::debug!(
                    "skipping detection on frame {}: invalid box {:?}",
                    detection.frame_number,
                    detection.bounding_box
                );
                report.skipped.push(PlayerError::InvalidDetectionGeometry {
                    frame_number: detection.frame_number,
                });
                continue;
            }
            report.labels.push(draw_detection(surface, detection, &geometry));
        }
        Ok(report)
    }
}

fn draw_detection(
    surface: &mut dyn Surface,
    detection: &Detection,
    geometry: &DisplayGeometry,
) -> String {
    let color_hint = detection
        .color
        .as_deref()
        .filter(|hint| resolve_rgb(Some(hint)).is_some())
        .unwrap_or(DEFAULT_OVERLAY_COLOR);
    let color = overlay_rgba(Some(color_hint));

    let target = map_box(&detection.bounding_box, geometry.scale());
    surface.stroke_rect(target, color, STROKE_WIDTH);

    let text = detection.label();
    let font_size = geometry.label_font_size();
    let text_width = surface.measure_text(&text, font_size);
    let layout = layout_label(
        &target,
        text_width,
        font_size,
        geometry.display_width,
        geometry.display_height,
    );
    surface.fill_rect(layout.background, color);
    surface.fill_text(
        &text,
        layout.text_x,
        layout.text_y,
        font_size,
        text_rgba(Some(color_hint)),
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::render::surface::{DrawOp, RasterSurface, RecordingSurface};
    use image::Rgba;

    fn decoded(frame_number: u64, width: u32, height: u32) -> DecodedFrame {
        DecodedFrame {
            frame_number,
            image: RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255])),
        }
    }

    fn det(frame_number: u64, bbox: BoundingBox, color: Option<&str>) -> Detection {
        Detection {
            frame_number,
            bounding_box: bbox,
            object_class: "suitcase".into(),
            confidence: 0.912,
            color: color.map(str::to_string),
        }
    }

    #[test]
    fn draws_only_detections_of_the_current_frame() -> Result<(), PlayerError> {
        let bbox = BoundingBox::new(10.0, 40.0, 50.0, 80.0);
        let index = DetectionIndex::new(vec![
            det(1, bbox, None),
            det(1, bbox, None),
            det(2, bbox, None),
            det(3, bbox, None),
        ]);
        let mut surface = RecordingSurface::new();
        let report = OverlayRenderer::new(960).draw(&mut surface, decoded(2, 320, 240), &index)?;
        assert_eq!(report.drawn(), 1);
        assert_eq!(surface.boxes().len(), 1);
        assert_eq!(surface.labels(), ["suitcase (91.2%)"]);
        Ok(())
    }

    #[test]
    fn scales_boxes_to_display_size() -> Result<(), PlayerError> {
        let bbox = BoundingBox::new(100.0, 200.0, 300.0, 400.0);
        let index = DetectionIndex::new(vec![det(0, bbox, None)]);
        let mut surface = RecordingSurface::new();
        let report =
            OverlayRenderer::new(960).draw(&mut surface, decoded(0, 1920, 1080), &index)?;
        assert_eq!(surface.size(), (960, 540));
        assert_eq!(report.geometry.display_height, 540);
        assert_eq!(
            surface.boxes(),
            [ScreenRect::new(50.0, 100.0, 100.0, 100.0)]
        );
        assert_eq!(surface.ops()[1], DrawOp::Image { width: 960, height: 540 });
        Ok(())
    }

    #[test]
    fn label_uses_detection_color_and_contrast() -> Result<(), PlayerError> {
        let bbox = BoundingBox::new(10.0, 50.0, 60.0, 90.0);
        let index = DetectionIndex::new(vec![det(0, bbox, Some("yellow"))]);
        let mut surface = RecordingSurface::new();
        OverlayRenderer::new(640).draw(&mut surface, decoded(0, 200, 100), &index)?;
        let yellow = Rgba([255, 255, 0, 255]);
        let black = Rgba([0, 0, 0, 255]);
        let ops = surface.ops();
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::StrokeRect { color, line_width: 2, .. } if *color == yellow
        )));
        assert!(ops
            .iter()
            .any(|op| matches!(op, DrawOp::FillRect { color, .. } if *color == yellow)));
        assert!(ops
            .iter()
            .any(|op| matches!(op, DrawOp::Text { color, .. } if *color == black)));
        Ok(())
    }

    #[test]
    fn unusable_color_hint_falls_back_to_red_with_white_text() -> Result<(), PlayerError> {
        let bbox = BoundingBox::new(10.0, 50.0, 60.0, 90.0);
        let index = DetectionIndex::new(vec![det(0, bbox, Some("mauve-ish"))]);
        let mut surface = RecordingSurface::new();
        OverlayRenderer::new(640).draw(&mut surface, decoded(0, 200, 100), &index)?;
        let red = Rgba([255, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        let ops = surface.ops();
        assert!(ops
            .iter()
            .any(|op| matches!(op, DrawOp::StrokeRect { color, .. } if *color == red)));
        assert!(ops
            .iter()
            .any(|op| matches!(op, DrawOp::Text { color, .. } if *color == white)));
        Ok(())
    }

    #[test]
    fn invalid_geometry_is_skipped_not_drawn() -> Result<(), PlayerError> {
        let index = DetectionIndex::new(vec![
            det(0, BoundingBox::new(50.0, 10.0, 20.0, 40.0), None),
            det(0, BoundingBox::new(f32::NAN, 10.0, 20.0, 40.0), None),
            det(0, BoundingBox::new(5.0, 30.0, 20.0, 40.0), None),
        ]);
        let mut surface = RecordingSurface::new();
        let report = OverlayRenderer::new(640).draw(&mut surface, decoded(0, 100, 100), &index)?;
        assert_eq!(report.drawn(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(surface.boxes().len(), 1);
        Ok(())
    }

    #[test]
    fn far_off_canvas_boxes_rasterize_without_panicking() -> Result<(), PlayerError> {
        let index = DetectionIndex::new(vec![
            det(0, BoundingBox::new(3e9, 10.0, 3e9, 20.0), None),
            det(0, BoundingBox::new(-900.0, -900.0, -800.0, -800.0), None),
        ]);
        let mut surface = RasterSurface::new();
        let report = OverlayRenderer::new(64).draw(&mut surface, decoded(0, 64, 48), &index)?;
        assert_eq!(report.drawn(), 2);
        assert_eq!(surface.size(), (64, 48));
        assert_eq!(surface.image().get_pixel(32, 40), &Rgba([40, 40, 40, 255]));
        Ok(())
    }

    #[test]
    fn zero_sized_image_leaves_surface_alone() {
        let mut surface = RecordingSurface::new();
        surface.resize(10, 10);
        let result = OverlayRenderer::new(640).draw(
            &mut surface,
            DecodedFrame {
                frame_number: 4,
                image: RgbaImage::new(0, 0),
            },
            &DetectionIndex::default(),
        );
        assert!(matches!(result, Err(PlayerError::ImageLoad { frame_number: 4, .. })));
        assert_eq!(surface.ops(), [DrawOp::Resize { width: 10, height: 10 }]);
    }

    #[test]
    fn label_sits_above_box_when_there_is_room() {
        let layout = layout_label(&ScreenRect::new(20.0, 50.0, 40.0, 30.0), 30.0, 10.0, 200, 100);
        assert_eq!(layout.placement, LabelPlacement::Above);
        assert_eq!(layout.background, ScreenRect::new(20.0, 35.0, 34.0, 14.0));
        assert_eq!(layout.background.bottom(), 49.0);
        assert_eq!((layout.text_x, layout.text_y), (22.0, 37.0));
    }

    #[test]
    fn label_moves_inside_box_at_top_edge() {
        let layout = layout_label(&ScreenRect::new(20.0, 0.0, 40.0, 30.0), 30.0, 10.0, 200, 100);
        assert_eq!(layout.placement, LabelPlacement::Inside);
        assert_eq!(layout.background.y, 0.0);

        let layout = layout_label(&ScreenRect::new(20.0, 8.0, 40.0, 30.0), 30.0, 10.0, 200, 100);
        assert_eq!(layout.placement, LabelPlacement::Inside);
        assert_eq!(layout.background.y, 8.0);
    }

    #[test]
    fn label_stays_on_canvas_horizontally_and_vertically() {
        let layout = layout_label(&ScreenRect::new(180.0, 2.0, 20.0, 10.0), 60.0, 10.0, 200, 16);
        assert_eq!(layout.background.x, 136.0);
        assert!(layout.background.right() <= 200.0);
        assert_eq!(layout.background.y, 2.0);

        let narrow = layout_label(&ScreenRect::new(5.0, 1.0, 2.0, 2.0), 500.0, 10.0, 100, 10);
        assert_eq!(narrow.background.x, 0.0);
        assert_eq!(narrow.background.y, 0.0);
    }
}
