mod index;
mod result;

pub use index::DetectionIndex;
pub use result::{BoundingBox, Detection, DetectionList};
