//! Heuristic defect classification.
//!
//! A region is described by the absolute differences of the mean hue,
//! saturation and value between the reference and test crops, and by the
//! aspect ratio of its bounding box. An ordered table of [`Rule`]s is walked
//! and the first rule that fires decides the category and its confidence.

use crate::{color, BoundingBox, InspectConfig};
use image::RgbImage;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DISCOLORATION_CONFIDENCE: f32 = 0.85;
pub const SCRATCH_CONFIDENCE: f32 = 0.90;
pub const MISSING_COMPONENT_CONFIDENCE: f32 = 0.88;
pub const FALLBACK_CONFIDENCE: f32 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DefectKind {
    Discoloration,
    Scratch,
    #[cfg_attr(feature = "serde", serde(rename = "Missing Component"))]
    MissingComponent,
    Defect,
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefectKind::Discoloration => "Discoloration",
            DefectKind::Scratch => "Scratch",
            DefectKind::MissingComponent => "Missing Component",
            DefectKind::Defect => "Defect",
        })
    }
}

/// What the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFeatures {
    pub hue_delta: f64,
    pub saturation_delta: f64,
    pub value_delta: f64,
    pub aspect_ratio: f64,
}

impl RegionFeatures {
    /// Compares the crops of one region from both images.
    pub fn measure(reference_roi: &RgbImage, test_roi: &RgbImage, bbox: &BoundingBox) -> Self {
        let [rh, rs, rv] = color::mean_hsv(reference_roi);
        let [th, ts, tv] = color::mean_hsv(test_roi);
        Self {
            hue_delta: (rh - th).abs(),
            saturation_delta: (rs - ts).abs(),
            value_delta: (rv - tv).abs(),
            aspect_ratio: bbox.aspect_ratio(),
        }
    }
}

/// One entry of the classification table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rule {
    /// The mean hue moved by more than `min_delta`.
    HueShift { min_delta: f64 },
    /// The box is wider than `high` or taller than `1 / low`.
    Elongated { high: f64, low: f64 },
    /// The mean value moved by more than `min_delta`.
    ValueDrop { min_delta: f64 },
    /// Always fires.
    Fallback,
}

impl Rule {
    pub fn fires(&self, features: &RegionFeatures) -> bool {
        match *self {
            Rule::HueShift { min_delta } => features.hue_delta > min_delta,
            Rule::Elongated { high, low } => {
                features.aspect_ratio > high || features.aspect_ratio < low
            }
            Rule::ValueDrop { min_delta } => features.value_delta > min_delta,
            Rule::Fallback => true,
        }
    }

    pub fn verdict(&self) -> (DefectKind, f32) {
        match self {
            Rule::HueShift { .. } => (DefectKind::Discoloration, DISCOLORATION_CONFIDENCE),
            Rule::Elongated { .. } => (DefectKind::Scratch, SCRATCH_CONFIDENCE),
            Rule::ValueDrop { .. } => (DefectKind::MissingComponent, MISSING_COMPONENT_CONFIDENCE),
            Rule::Fallback => (DefectKind::Defect, FALLBACK_CONFIDENCE),
        }
    }
}

/// The ordered rule table, first match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRules {
    rules: Vec<Rule>,
}

impl ClassificationRules {
    /// A custom table. If no rule fires the region becomes a generic defect.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Hue shift, elongation, value drop, fallback, with thresholds from `config`.
    pub fn from_config(config: &InspectConfig) -> Self {
        Self::new(vec![
            Rule::HueShift {
                min_delta: config.hue_delta,
            },
            Rule::Elongated {
                high: config.scratch_aspect_high,
                low: config.scratch_aspect_low,
            },
            Rule::ValueDrop {
                min_delta: config.value_delta,
            },
            Rule::Fallback,
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(&self, features: &RegionFeatures) -> (DefectKind, f32) {
        self.rules
            .iter()
            .find(|rule| rule.fires(features))
            .unwrap_or(&Rule::Fallback)
            .verdict()
    }
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self::from_config(&InspectConfig::default())
    }
}

/// Classifies one region from its reference and test crops.
pub fn classify(
    reference_roi: &RgbImage,
    test_roi: &RgbImage,
    bbox: &BoundingBox,
    rules: &ClassificationRules,
) -> (DefectKind, f32) {
    rules.evaluate(&RegionFeatures::measure(reference_roi, test_roi, bbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn uniform(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    fn features(hue_delta: f64, value_delta: f64, aspect_ratio: f64) -> RegionFeatures {
        RegionFeatures {
            hue_delta,
            saturation_delta: 0.0,
            value_delta,
            aspect_ratio,
        }
    }

    #[test]
    fn elongated_region_is_scratch() {
        // Same hue and value, only the shape differs.
        let reference = uniform(40, 10, [40, 90, 30]);
        let test = uniform(40, 10, [40, 90, 30]);
        assert_eq!(
            classify(&reference, &test, &BoundingBox::new(0, 0, 40, 10), &ClassificationRules::default()),
            (DefectKind::Scratch, 0.90)
        );
        assert_eq!(
            classify(&reference, &test, &BoundingBox::new(0, 0, 10, 40), &ClassificationRules::default()),
            (DefectKind::Scratch, 0.90)
        );
    }

    #[test]
    fn hue_wins_over_shape() {
        let reference = uniform(40, 10, [200, 40, 40]);
        let test = uniform(40, 10, [40, 200, 40]);
        assert_eq!(
            classify(&reference, &test, &BoundingBox::new(0, 0, 40, 10), &ClassificationRules::default()),
            (DefectKind::Discoloration, 0.85)
        );
    }

    #[test]
    fn value_drop_is_missing_component() {
        // Pale part on dark board of the same hue.
        let reference = uniform(30, 30, [120, 200, 100]);
        let test = uniform(30, 30, [25, 50, 20]);
        assert_eq!(
            classify(&reference, &test, &BoundingBox::new(0, 0, 30, 30), &ClassificationRules::default()),
            (DefectKind::MissingComponent, 0.88)
        );
    }

    #[test]
    fn nothing_fires_gives_generic_defect() {
        let reference = uniform(20, 20, [25, 50, 20]);
        let test = uniform(20, 20, [30, 60, 24]);
        assert_eq!(
            classify(&reference, &test, &BoundingBox::new(0, 0, 20, 20), &ClassificationRules::default()),
            (DefectKind::Defect, 0.50)
        );
    }

    #[test]
    fn thresholds_are_strict() {
        let rules = ClassificationRules::default();
        assert_eq!(rules.evaluate(&features(20.0, 40.0, 3.0)).0, DefectKind::Defect);
        assert_eq!(rules.evaluate(&features(20.1, 0.0, 1.0)).0, DefectKind::Discoloration);
        assert_eq!(rules.evaluate(&features(0.0, 0.0, 0.32)).0, DefectKind::Scratch);
        assert_eq!(rules.evaluate(&features(0.0, 40.1, 1.0)).0, DefectKind::MissingComponent);
    }

    #[test]
    fn flat_box_counts_as_elongated() {
        let rules = ClassificationRules::default();
        let reference = uniform(5, 1, [25, 50, 20]);
        assert_eq!(
            classify(&reference, &reference, &BoundingBox::new(0, 0, 5, 0), &rules),
            (DefectKind::Scratch, 0.90)
        );
    }

    #[test]
    fn custom_table_without_fallback() {
        let rules = ClassificationRules::new(vec![Rule::ValueDrop { min_delta: 10.0 }]);
        assert_eq!(rules.evaluate(&features(90.0, 5.0, 10.0)), (DefectKind::Defect, 0.50));
        assert_eq!(
            rules.evaluate(&features(0.0, 11.0, 1.0)),
            (DefectKind::MissingComponent, 0.88)
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(DefectKind::MissingComponent.to_string(), "Missing Component");
        assert_eq!(DefectKind::Discoloration.to_string(), "Discoloration");
    }
}
