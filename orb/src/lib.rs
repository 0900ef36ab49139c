//! ORB feature extraction.
//!
//! Oriented FAST corners are detected on a scale pyramid, ranked by their
//! Harris response, oriented with the intensity centroid of their patch and
//! described with 256-bit steered BRIEF descriptors. Descriptors are
//! [`BitArray`]s so they can be compared with the Hamming metric.

mod descriptors;
mod detector_response;
mod fast;
pub mod image;
mod pattern;

use crate::image::{gaussian_blur, GrayFloatImage};
use ::image::{DynamicImage, GrayImage, ImageResult};
use bitarray::BitArray;
use float_ord::FloatOrd;
use log::*;
use pcb_core::nalgebra::Point2;
use pcb_core::ImagePoint;
use std::cmp::Reverse;
use std::path::Path;

pub use descriptors::Descriptor;
pub use pattern::{brief_pattern, PATTERN_PAIRS};

/// Standard deviation of the blur applied before sampling BRIEF pairs.
const BRIEF_SIGMA: f32 = 2.0;
/// Size of the blur window applied before sampling BRIEF pairs.
const BRIEF_KERNEL_SIZE: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("descriptor sample ({x}, {y}) is outside the {width} x {height} level")]
    SampleOutOfBounds {
        x: isize,
        y: isize,
        width: usize,
        height: usize,
    },
}

/// A point of interest in an image.
/// This pretty much follows from OpenCV conventions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyPoint {
    /// The horizontal and vertical coordinate in pixels of the full
    /// resolution image, +x to the right and +y towards the bottom.
    pub point: (f32, f32),
    /// The Harris response of the corner.
    pub response: f32,
    /// The diameter of the described patch, in pixel units.
    pub size: f32,
    /// The pyramid level the keypoint was detected on.
    pub octave: usize,
    /// The orientation angle in radians.
    pub angle: f32,
}

impl ImagePoint for KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        Point2::new(self.point.0 as f64, self.point.1 as f64)
    }
}

/// Contains the configuration parameters of ORB.
///
/// The defaults mirror the usual ORB setup: 8 pyramid levels with a scale
/// factor of 1.2, FAST threshold 20 and a 31 pixel patch. The most important
/// parameter for callers is `max_keypoints`; [`Orb::new`] sets it and leaves
/// everything else default.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Orb {
    /// Upper bound on the number of keypoints over all levels.
    pub max_keypoints: usize,

    /// Ratio between the sizes of two consecutive pyramid levels.
    pub scale_factor: f32,

    /// Number of pyramid levels, including the full resolution image.
    pub num_levels: usize,

    /// Intensity difference (0-255) for a circle pixel to count in the FAST test.
    pub fast_threshold: u8,

    /// Distance from the level border inside which no corners are detected.
    pub edge_threshold: usize,

    /// Diameter of the patch used for orientation.
    pub patch_size: usize,

    /// The `k` of the Harris measure.
    pub harris_k: f32,
}

impl Orb {
    /// Convenience constructor for the common case of capping the number of
    /// keypoints.
    pub fn new(max_keypoints: usize) -> Self {
        Self {
            max_keypoints,
            ..Default::default()
        }
    }
}

impl Default for Orb {
    fn default() -> Orb {
        Orb {
            max_keypoints: 500,
            scale_factor: 1.2,
            num_levels: 8,
            fast_threshold: 20,
            edge_threshold: 31,
            patch_size: 31,
            harris_k: 0.04,
        }
    }
}

impl Orb {
    /// Splits `max_keypoints` over the pyramid levels proportionally to the
    /// level area; the last level receives the remainder.
    fn level_budgets(&self) -> Vec<usize> {
        let levels = self.num_levels.max(1);
        let factor = 1.0 / self.scale_factor as f64;
        let first = self.max_keypoints as f64 * (1.0 - factor) / (1.0 - factor.powi(levels as i32));
        let mut budgets = Vec::with_capacity(levels);
        let mut assigned = 0usize;
        let mut desired = first;
        for _ in 0..levels - 1 {
            let budget = (desired.round() as usize).min(self.max_keypoints - assigned);
            budgets.push(budget);
            assigned += budget;
            desired *= factor;
        }
        budgets.push(self.max_keypoints - assigned);
        budgets
    }

    /// Detect, rank and orient the keypoints of one level, in level coordinates.
    fn find_level_keypoints(&self, level: &GrayFloatImage, octave: usize, budget: usize) -> Vec<KeyPoint> {
        let mut keypoints: Vec<KeyPoint> = self
            .detect_corners(level)
            .into_iter()
            .map(|corner| KeyPoint {
                point: (corner.x as f32, corner.y as f32),
                response: self.harris_response(level, corner.x, corner.y),
                size: self.patch_size as f32,
                octave,
                angle: 0.0,
            })
            .collect();
        // Stable, so equal responses keep raster order.
        keypoints.sort_by_key(|kp| Reverse(FloatOrd(kp.response)));
        keypoints.truncate(budget);
        for keypoint in keypoints.iter_mut() {
            let (x, y) = keypoint.point;
            keypoint.angle = self.intensity_centroid_angle(level, x as usize, y as usize);
        }
        keypoints
    }

    /// Extract features from an already converted float image.
    ///
    /// Returns the keypoints (in full resolution coordinates) and their
    /// descriptors, in parallel vectors.
    pub fn extract_from_gray_float_image(
        &self,
        image: &GrayFloatImage,
    ) -> (Vec<KeyPoint>, Vec<Descriptor>) {
        let mut all_keypoints = vec![];
        let mut all_descriptors = vec![];
        for (octave, budget) in self.level_budgets().into_iter().enumerate() {
            let scale = self.scale_factor.powi(octave as i32);
            let width = (image.width() as f32 / scale).round() as usize;
            let height = (image.height() as f32 / scale).round() as usize;
            if width <= 2 * self.edge_threshold || height <= 2 * self.edge_threshold {
                debug!("Stopping pyramid at level {} ({} x {})", octave, width, height);
                break;
            }
            let level = if octave == 0 {
                image.clone()
            } else {
                image.resize(width, height)
            };
            trace!("Finding keypoints on level {}.", octave);
            let keypoints = self.find_level_keypoints(&level, octave, budget);
            let smoothed = gaussian_blur(&level, BRIEF_SIGMA, BRIEF_KERNEL_SIZE);
            trace!("Extracting descriptors on level {}.", octave);
            let (keypoints, descriptors) = self.extract_descriptors(&smoothed, &keypoints);
            all_keypoints.extend(keypoints.into_iter().map(|mut keypoint| {
                keypoint.point = (keypoint.point.0 * scale, keypoint.point.1 * scale);
                keypoint.size *= scale;
                keypoint
            }));
            all_descriptors.extend(descriptors);
        }
        info!("Extracted {} features", all_keypoints.len());
        (all_keypoints, all_descriptors)
    }

    /// Extract features from an 8-bit grayscale image.
    pub fn extract_gray(&self, image: &GrayImage) -> (Vec<KeyPoint>, Vec<Descriptor>) {
        self.extract_from_gray_float_image(&GrayFloatImage::from_gray(image))
    }

    /// Extract features using the ORB feature extractor.
    ///
    /// # Example
    /// ```
    /// let image = image::DynamicImage::new_luma8(64, 64);
    /// let (keypoints, descriptors) = orb::Orb::default().extract(&image);
    /// assert!(keypoints.is_empty() && descriptors.is_empty());
    /// ```
    pub fn extract(&self, image: &DynamicImage) -> (Vec<KeyPoint>, Vec<BitArray<32>>) {
        self.extract_from_gray_float_image(&GrayFloatImage::from_dynamic(image))
    }

    /// Extract features from an image on disk.
    pub fn extract_path(
        &self,
        path: impl AsRef<Path>,
    ) -> ImageResult<(Vec<KeyPoint>, Vec<BitArray<32>>)> {
        Ok(self.extract(&::image::open(path)?))
    }
}
