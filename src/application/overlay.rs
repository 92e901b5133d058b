//! Drawing primitives for lane annotations.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::domain::detection::DetectionResult;
use crate::domain::errors::{DomainError, DomainResult};

pub const ACTIVE: Rgb<u8> = Rgb([0, 255, 0]);
pub const GO_TEXT: Rgb<u8> = Rgb([0, 200, 100]);
pub const WAITING: Rgb<u8> = Rgb([255, 0, 0]);
pub const LANE_LABEL: Rgb<u8> = Rgb([255, 0, 25]);
pub const DETECTION_BOX: Rgb<u8> = Rgb([180, 0, 25]);

const BORDER_THICKNESS: u32 = 10;
const BOX_THICKNESS: u32 = 3;
const TEXT_SCALE: f32 = 40.0;

/// Draws borders, boxes and labels onto lane canvases.
///
/// Text needs a TrueType font. Without one, labels are skipped and only shapes are drawn.
pub struct Overlay {
    font: Option<FontVec>,
}

impl Overlay {
    pub fn new(font: Option<FontVec>) -> Self {
        Self { font }
    }

    pub fn without_text() -> Self {
        Self { font: None }
    }

    pub fn from_font_file(path: &Path) -> DomainResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| DomainError::NotFound(format!("font {}: {e}", path.display())))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| DomainError::InvalidInput(format!("font {}: {e}", path.display())))?;
        Ok(Self::new(Some(font)))
    }

    /// Outline along the frame edges.
    pub fn border(&self, canvas: &mut RgbImage, color: Rgb<u8>) {
        let (w, h) = canvas.dimensions();
        outline(canvas, 0, 0, w, h, color, BORDER_THICKNESS);
    }

    pub fn text(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match &self.font {
            Some(font) => draw_text_mut(canvas, color, x, y, PxScale::from(TEXT_SCALE), font, text),
            None => debug!(text, "no font loaded, label skipped"),
        }
    }

    /// Raw detector output: one box per vehicle plus the running count.
    pub fn detections(&self, canvas: &mut RgbImage, detection: &DetectionResult) {
        for b in detection.boxes() {
            outline(canvas, b.x, b.y, b.width, b.height, DETECTION_BOX, BOX_THICKNESS);
        }
        let label = format!("Vehicle Count: {}", detection.count());
        self.text(canvas, 20, 30, &label, GO_TEXT);
    }
}

/// Hollow rectangle `thickness` pixels wide, growing inwards from the given bounds.
fn outline(canvas: &mut RgbImage, x: i32, y: i32, w: u32, h: u32, color: Rgb<u8>, thickness: u32) {
    for t in 0..thickness {
        let (iw, ih) = (w.saturating_sub(2 * t), h.saturating_sub(2 * t));
        if iw == 0 || ih == 0 {
            break;
        }
        let rect = Rect::at(x + t as i32, y + t as i32).of_size(iw, ih);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::BoundingBox;

    #[test]
    fn border_paints_edges_only() {
        let mut canvas = RgbImage::new(40, 30);
        Overlay::without_text().border(&mut canvas, ACTIVE);
        assert_eq!(*canvas.get_pixel(0, 0), ACTIVE);
        assert_eq!(*canvas.get_pixel(39, 29), ACTIVE);
        assert_eq!(*canvas.get_pixel(9, 15), ACTIVE);
        assert_eq!(canvas.get_pixel(20, 15).0, [0, 0, 0]);
    }

    #[test]
    fn boxes_are_drawn_at_detections() {
        let mut canvas = RgbImage::new(50, 50);
        let detection = DetectionResult::new(vec![BoundingBox::from_corners(10.0, 10.0, 30.0, 30.0, 0.9, 2)]);
        Overlay::without_text().detections(&mut canvas, &detection);
        assert_eq!(*canvas.get_pixel(10, 20), DETECTION_BOX);
        assert_eq!(canvas.get_pixel(20, 20).0, [0, 0, 0]);
    }

    #[test]
    fn tiny_or_empty_boxes_do_not_panic() {
        let mut canvas = RgbImage::new(8, 8);
        outline(&mut canvas, 2, 2, 0, 5, WAITING, 3);
        outline(&mut canvas, 2, 2, 3, 3, WAITING, 10);
        assert_eq!(*canvas.get_pixel(2, 2), WAITING);
    }
}
