use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Box corners in native image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Finite coordinates with `x1 <= x2` and `y1 <= y2`.
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 <= self.x2
            && self.y1 <= self.y2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// One detected object instance on one frame.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "DetectionRecord")]
pub struct Detection {
    pub frame_number: u64,
    pub bounding_box: BoundingBox,
    pub object_class: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Hex code or color name; `None` means the default overlay color.
    pub color: Option<String>,
}

impl Detection {
    /// `"<class> (<percent>%)"` with the percent rounded half-up to one
    /// decimal, e.g. `suitcase (87.5%)`.
    pub fn label(&self) -> String {
        let percent = (self.confidence * 1000.0).round() / 10.0;
        format!("{} ({:.1}%)", self.object_class, percent)
    }
}

/// Flat wire shape served by `/videos/{id}/detections`.
#[derive(Debug, Deserialize)]
struct DetectionRecord {
    frame_number: u64,
    bbox_x1: f32,
    bbox_y1: f32,
    bbox_x2: f32,
    bbox_y2: f32,
    #[serde(default)]
    object_class: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    color: Option<String>,
}

impl From<DetectionRecord> for Detection {
    fn from(record: DetectionRecord) -> Self {
        Self {
            frame_number: record.frame_number,
            bounding_box: BoundingBox::new(
                record.bbox_x1,
                record.bbox_y1,
                record.bbox_x2,
                record.bbox_y2,
            ),
            object_class: record.object_class,
            confidence: record.confidence,
            color: record.color.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Normalized detection list.
#[derive(Clone, Debug, Default)]
pub struct DetectionList {
    pub detections: Vec<Detection>,
    /// Entries dropped because they did not match the wire shape.
    pub skipped: usize,
}

impl DetectionList {
    /// Normalize a `/detections` response body.
    ///
    /// A missing or non-array `detections` field yields an empty list; single
    /// malformed entries are dropped and counted.
    pub fn from_value(body: Value) -> Self {
        let Some(Value::Array(entries)) = body.get("detections").cloned() else {
            return Self::default();
        };
        let mut list = Self::default();
        for entry in entries {
            match serde_json::from_value::<Detection>(entry) {
                Ok(detection) => list.detections.push(detection),
                Err(err) => {
                    log::debug!("dropping malformed detection entry: {}", err);
                    list.skipped += 1;
                }
            }
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_uses_one_decimal_percent() {
        let det = Detection {
            frame_number: 0,
            bounding_box: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            object_class: "suitcase".into(),
            confidence: 0.875,
            color: None,
        };
        assert_eq!(det.label(), "suitcase (87.5%)");
    }

    #[test]
    fn label_rounds_ties_up() {
        let mut det = Detection {
            frame_number: 0,
            bounding_box: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            object_class: "suitcase".into(),
            confidence: 0.5625,
            color: None,
        };
        assert_eq!(det.label(), "suitcase (56.3%)");
        det.confidence = 0.0625;
        assert_eq!(det.label(), "suitcase (6.3%)");
        det.confidence = 1.0;
        assert_eq!(det.label(), "suitcase (100.0%)");
    }

    #[test]
    fn missing_detections_field_normalizes_to_empty() {
        assert!(DetectionList::from_value(json!({})).detections.is_empty());
        assert!(DetectionList::from_value(json!(null)).detections.is_empty());
        assert!(DetectionList::from_value(json!({"detections": "nope"}))
            .detections
            .is_empty());
    }

    #[test]
    fn parses_flat_wire_records_and_drops_malformed_ones() {
        let body = json!({
            "detections": [
                {"frame_number": 3, "bbox_x1": 1.0, "bbox_y1": 2.0, "bbox_x2": 10.0,
                 "bbox_y2": 20.0, "object_class": "backpack", "confidence": 0.5, "color": "blue"},
                {"frame_number": 4, "object_class": "person"},
                {"frame_number": 5, "bbox_x1": 0, "bbox_y1": 0, "bbox_x2": 4, "bbox_y2": 4,
                 "object_class": "person", "confidence": 0.9, "color": ""}
            ]
        });
        let list = DetectionList::from_value(body);
        assert_eq!(list.detections.len(), 2);
        assert_eq!(list.skipped, 1);
        assert_eq!(list.detections[0].bounding_box, BoundingBox::new(1.0, 2.0, 10.0, 20.0));
        assert_eq!(list.detections[0].color.as_deref(), Some("blue"));
        assert_eq!(list.detections[1].color, None);
    }

    #[test]
    fn rejects_inverted_and_non_finite_boxes() {
        assert!(BoundingBox::new(0.0, 0.0, 5.0, 5.0).is_valid());
        assert!(BoundingBox::new(2.0, 2.0, 2.0, 2.0).is_valid());
        assert!(!BoundingBox::new(5.0, 0.0, 1.0, 5.0).is_valid());
        assert!(!BoundingBox::new(0.0, 6.0, 5.0, 5.0).is_valid());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 5.0, 5.0).is_valid());
        assert!(!BoundingBox::new(0.0, 0.0, f32::INFINITY, 5.0).is_valid());
    }
}
