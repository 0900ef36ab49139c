use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Allows the retrieval of the point on the image the feature came from.
pub trait ImagePoint {
    /// Retrieves the point on the image
    fn image_point(&self) -> Point2<f64>;
}

/// A point on an image frame in pixel coordinates.
///
/// Detectors usually carry extra information with their keypoints (response,
/// orientation, scale). Anything that implements [`ImagePoint`] can be turned
/// into this plain location with [`KeyPoint::from_image_point`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyPoint(pub Point2<f64>);

impl KeyPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self(Point2::new(x, y))
    }

    pub fn from_image_point(point: &impl ImagePoint) -> Self {
        Self(point.image_point())
    }
}

impl ImagePoint for KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        self.0
    }
}
