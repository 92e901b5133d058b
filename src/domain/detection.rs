use serde::{Deserialize, Serialize};

/// COCO class ids counted as vehicles: car, motorcycle, bus, train, truck.
pub const VEHICLE_CLASSES: [usize; 5] = [2, 3, 5, 6, 7];

/// Minimum score for a detection to count as a vehicle.
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub score: f32,
    pub class_id: usize,
}

impl BoundingBox {
    /// Builds a box from corner coordinates, rounding to whole pixels.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: usize) -> Self {
        let (left, right) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (top, bottom) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Self {
            x: left.round() as i32,
            y: top.round() as i32,
            width: (right - left).round().max(0.0) as u32,
            height: (bottom - top).round().max(0.0) as u32,
            score,
            class_id,
        }
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x.max(other.x) as f32;
        let iy1 = self.y.max(other.y) as f32;
        let ix2 = (self.x + self.width as i32).min(other.x + other.width as i32) as f32;
        let iy2 = (self.y + self.height as i32).min(other.y + other.height as i32) as f32;

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Vehicles found in one frame. The count is derived from the boxes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    boxes: Vec<BoundingBox>,
}

impl DetectionResult {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self { boxes }
    }

    /// Keeps only confident vehicle-class candidates, preserving their order.
    pub fn from_candidates(candidates: impl IntoIterator<Item = BoundingBox>) -> Self {
        let boxes = candidates
            .into_iter()
            .filter(is_vehicle)
            .collect();
        Self { boxes }
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn count(&self) -> usize {
        self.boxes.len()
    }
}

pub fn is_vehicle(candidate: &BoundingBox) -> bool {
    candidate.score >= MIN_CONFIDENCE && VEHICLE_CLASSES.contains(&candidate.class_id)
}

/// Greedy non-maximum suppression: highest score first, drop anything overlapping a kept box by
/// more than `iou_threshold`.
pub fn suppress_overlaps(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}
