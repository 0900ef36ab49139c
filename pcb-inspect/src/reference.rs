use crate::{color, InspectConfig, LoadError};
use image::{DynamicImage, GrayImage, RgbImage};
use log::*;
use orb::{Descriptor, KeyPoint, Orb};
use std::path::Path;

/// Keypoints of one image and their descriptors, in parallel vectors.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: Vec<Descriptor>,
}

impl FeatureIndex {
    /// Runs the detector configured by `config` over a gray image.
    pub fn extract(gray: &GrayImage, config: &InspectConfig) -> Self {
        let (keypoints, descriptors) = detector(config).extract_gray(gray);
        Self {
            keypoints,
            descriptors,
        }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// The detector used for both sides of every alignment.
pub(crate) fn detector(config: &InspectConfig) -> Orb {
    Orb::new(config.max_keypoints)
}

/// The known-good board every test image is compared against.
///
/// It is built once and never changes afterwards, so one instance can be
/// shared by any number of concurrent inspections.
#[derive(Debug, Clone)]
pub struct ReferenceModel {
    image: RgbImage,
    gray: GrayImage,
    features: FeatureIndex,
}

impl ReferenceModel {
    /// Loads the golden image from disk and indexes its features.
    pub fn initialize(path: impl AsRef<Path>, config: &InspectConfig) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded reference {}", path.display());
        Self::from_image(image, config)
    }

    pub fn from_image(image: DynamicImage, config: &InspectConfig) -> Result<Self, LoadError> {
        let image = image.to_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(LoadError::Empty);
        }
        let gray = color::to_gray(&image);
        let features = FeatureIndex::extract(&gray, config);
        info!(
            "Reference is {} x {} with {} keypoints",
            image.width(),
            image.height(),
            features.len()
        );
        Ok(Self {
            image,
            gray,
            features,
        })
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn features(&self) -> &FeatureIndex {
        &self.features
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    #[test]
    fn empty_image_is_rejected() {
        let result = ReferenceModel::from_image(DynamicImage::new_rgb8(0, 0), &InspectConfig::default());
        assert!(matches!(result, Err(LoadError::Empty)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ReferenceModel::initialize("does/not/exist.png", &InspectConfig::default()).unwrap_err();
        match err {
            LoadError::Decode { path, .. } => assert_eq!(path, Path::new("does/not/exist.png")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn board_has_features() {
        let board = synth::synthetic_board(320, 240, 1);
        let reference =
            ReferenceModel::from_image(DynamicImage::ImageRgb8(board), &InspectConfig::default()).unwrap();
        assert_eq!(reference.dimensions(), (320, 240));
        assert_eq!(reference.gray().dimensions(), (320, 240));
        assert!(reference.features().len() > 50);
        assert_eq!(
            reference.features().keypoints.len(),
            reference.features().descriptors.len()
        );
    }
}
