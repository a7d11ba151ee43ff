use std::collections::HashMap;

use super::result::Detection;

/// Detections grouped by frame number.
///
/// The backend returns one flat, unordered list per video (tens of thousands
/// of entries for long clips). Grouping once on receipt keeps the per-draw
/// lookup independent of the total count.
#[derive(Clone, Debug, Default)]
pub struct DetectionIndex {
    by_frame: HashMap<u64, Vec<Detection>>,
    total: usize,
}

impl DetectionIndex {
    pub fn new(detections: Vec<Detection>) -> Self {
        let total = detections.len();
        let mut by_frame: HashMap<u64, Vec<Detection>> = HashMap::new();
        for detection in detections {
            by_frame
                .entry(detection.frame_number)
                .or_default()
                .push(detection);
        }
        Self { by_frame, total }
    }

    /// Detections on `frame_number`, in the order the backend returned them.
    pub fn for_frame(&self, frame_number: u64) -> &[Detection] {
        self.by_frame
            .get(&frame_number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct frames carrying at least one detection.
    pub fn frame_count(&self) -> usize {
        self.by_frame.len()
    }
}

impl FromIterator<Detection> for DetectionIndex {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn det(frame_number: u64, class: &str) -> Detection {
        Detection {
            frame_number,
            bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            object_class: class.to_string(),
            confidence: 0.9,
            color: None,
        }
    }

    #[test]
    fn groups_by_frame_number() {
        let index: DetectionIndex = [det(1, "a"), det(1, "b"), det(2, "c"), det(3, "d")]
            .into_iter()
            .collect();
        assert_eq!(index.len(), 4);
        assert_eq!(index.frame_count(), 3);
        assert_eq!(index.for_frame(1).len(), 2);
        assert_eq!(index.for_frame(2).len(), 1);
        assert_eq!(index.for_frame(2)[0].object_class, "c");
        assert!(index.for_frame(9).is_empty());
    }

    #[test]
    fn preserves_backend_order_within_a_frame() {
        let index = DetectionIndex::new(vec![det(7, "first"), det(8, "x"), det(7, "second")]);
        let classes: Vec<_> = index
            .for_frame(7)
            .iter()
            .map(|d| d.object_class.as_str())
            .collect();
        assert_eq!(classes, ["first", "second"]);
    }
}
