use crate::classify::DefectKind;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width over height, 0 for a box without height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// The center rounded down.
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Whether the box lies entirely inside a `width` x `height` image.
    pub fn is_inside(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// An external region where the aligned test image differs from the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectRegion {
    pub bbox: BoundingBox,
    /// Area enclosed by the outer contour.
    pub area: f64,
    /// Center of the bounding box.
    pub center: (u32, u32),
    /// Centroid of the outer contour polygon.
    pub centroid: (f64, f64),
    pub kind: DefectKind,
    pub confidence: f32,
}

impl DefectRegion {
    /// The flat record written to reports.
    pub fn record(&self) -> DefectRecord {
        DefectRecord {
            kind: self.kind,
            confidence: self.confidence,
            bbox: [self.bbox.x, self.bbox.y, self.bbox.width, self.bbox.height],
            center: [self.center.0, self.center.1],
        }
    }
}

/// Report view of a [`DefectRegion`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DefectRecord {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: DefectKind,
    pub confidence: f32,
    /// `[x, y, width, height]`
    pub bbox: [u32; 4],
    pub center: [u32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_handles_flat_boxes() {
        assert_eq!(BoundingBox::new(0, 0, 30, 10).aspect_ratio(), 3.0);
        assert_eq!(BoundingBox::new(0, 0, 30, 0).aspect_ratio(), 0.0);
    }

    #[test]
    fn center_rounds_down() {
        assert_eq!(BoundingBox::new(10, 20, 5, 7).center(), (12, 23));
    }

    #[test]
    fn containment() {
        assert!(BoundingBox::new(90, 0, 10, 10).is_inside(100, 10));
        assert!(!BoundingBox::new(91, 0, 10, 10).is_inside(100, 10));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn record_serializes_with_type_key() {
        let region = DefectRegion {
            bbox: BoundingBox::new(4, 5, 20, 10),
            area: 150.0,
            center: (14, 10),
            centroid: (13.5, 9.5),
            kind: DefectKind::MissingComponent,
            confidence: 0.88,
        };
        let json = serde_json::to_value(region.record()).unwrap();
        assert_eq!(json["type"], "Missing Component");
        assert_eq!(json["bbox"], serde_json::json!([4, 5, 20, 10]));
        assert_eq!(json["center"], serde_json::json!([14, 10]));
    }
}
