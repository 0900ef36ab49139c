#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Gray-level difference a pixel must exceed to count as changed.
pub const DIFF_THRESHOLD: u8 = 30;
/// Smallest area enclosed by a region's outer contour reported as a defect.
pub const MIN_REGION_AREA: u32 = 100;
/// Mean hue difference (OpenCV units, 0-179) above which a region is discolored.
pub const HUE_DELTA: f64 = 20.0;
/// Width over height above which a region is a scratch.
pub const SCRATCH_ASPECT_HIGH: f64 = 3.0;
/// Width over height below which a region is a scratch.
pub const SCRATCH_ASPECT_LOW: f64 = 0.33;
/// Mean value difference (0-255) above which a component is missing.
pub const VALUE_DELTA: f64 = 40.0;
/// Fraction of the symmetric matches kept, best first.
pub const MATCH_RETENTION: f64 = 0.15;
/// Keypoint cap for both the reference and every test image.
pub const MAX_KEYPOINTS: usize = 5000;
/// Reprojection error in pixels under which a match is an inlier.
pub const RANSAC_THRESHOLD: f64 = 5.0;
/// Radius of the square structuring element (1 gives 3x3).
pub const MORPH_RADIUS: u8 = 1;

/// The settings of the inspection pipeline.
///
/// Every threshold the pipeline uses lives here. The defaults are the
/// constants of this module.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InspectConfig {
    /// The maximum number of ORB keypoints per image
    #[cfg_attr(feature = "serde", serde(default = "default_max_keypoints"))]
    pub max_keypoints: usize,
    /// The fraction of symmetric matches handed to the consensus
    #[cfg_attr(feature = "serde", serde(default = "default_match_retention"))]
    pub match_retention: f64,
    /// The inlier threshold of the homography consensus in pixels
    #[cfg_attr(feature = "serde", serde(default = "default_ransac_threshold"))]
    pub ransac_threshold: f64,
    /// The gray difference a pixel must exceed to be marked
    #[cfg_attr(feature = "serde", serde(default = "default_diff_threshold"))]
    pub diff_threshold: u8,
    /// The radius of the opening and dilation structuring element
    #[cfg_attr(feature = "serde", serde(default = "default_morph_radius"))]
    pub morph_radius: u8,
    /// The minimum contour area of a reported region
    #[cfg_attr(feature = "serde", serde(default = "default_min_region_area"))]
    pub min_region_area: u32,
    /// The mean hue difference that makes a region a discoloration
    #[cfg_attr(feature = "serde", serde(default = "default_hue_delta"))]
    pub hue_delta: f64,
    /// The aspect ratio above which a region is a scratch
    #[cfg_attr(feature = "serde", serde(default = "default_scratch_aspect_high"))]
    pub scratch_aspect_high: f64,
    /// The aspect ratio below which a region is a scratch
    #[cfg_attr(feature = "serde", serde(default = "default_scratch_aspect_low"))]
    pub scratch_aspect_low: f64,
    /// The mean value difference that makes a region a missing component
    #[cfg_attr(feature = "serde", serde(default = "default_value_delta"))]
    pub value_delta: f64,
    /// Seed of the consensus RNG, `None` seeds from entropy
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: Option<u64>,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            max_keypoints: default_max_keypoints(),
            match_retention: default_match_retention(),
            ransac_threshold: default_ransac_threshold(),
            diff_threshold: default_diff_threshold(),
            morph_radius: default_morph_radius(),
            min_region_area: default_min_region_area(),
            hue_delta: default_hue_delta(),
            scratch_aspect_high: default_scratch_aspect_high(),
            scratch_aspect_low: default_scratch_aspect_low(),
            value_delta: default_value_delta(),
            seed: None,
        }
    }
}

impl InspectConfig {
    /// The default settings with a fixed consensus seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }
}

fn default_max_keypoints() -> usize {
    MAX_KEYPOINTS
}

fn default_match_retention() -> f64 {
    MATCH_RETENTION
}

fn default_ransac_threshold() -> f64 {
    RANSAC_THRESHOLD
}

fn default_diff_threshold() -> u8 {
    DIFF_THRESHOLD
}

fn default_morph_radius() -> u8 {
    MORPH_RADIUS
}

fn default_min_region_area() -> u32 {
    MIN_REGION_AREA
}

fn default_hue_delta() -> f64 {
    HUE_DELTA
}

fn default_scratch_aspect_high() -> f64 {
    SCRATCH_ASPECT_HIGH
}

fn default_scratch_aspect_low() -> f64 {
    SCRATCH_ASPECT_LOW
}

fn default_value_delta() -> f64 {
    VALUE_DELTA
}
