use crate::image::GrayFloatImage;
use crate::pattern::brief_pattern;
use crate::{Error, KeyPoint, Orb};
use bitarray::BitArray;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A 256-bit rotated BRIEF descriptor.
pub type Descriptor = BitArray<32>;

impl Orb {
    /// Extract descriptors for keypoints detected on one pyramid level.
    ///
    /// Keypoint coordinates are expected in the level's own pixel frame.
    /// Keypoints whose rotated pattern leaves the image are dropped.
    ///
    /// # Arguments
    /// * `smoothed` - the Gaussian-smoothed pyramid level
    /// * `keypoints` - the keypoints detected on that level
    /// # Return value
    /// The surviving keypoints and their descriptors.
    pub fn extract_descriptors(
        &self,
        smoothed: &GrayFloatImage,
        keypoints: &[KeyPoint],
    ) -> (Vec<KeyPoint>, Vec<Descriptor>) {
        #[cfg(not(feature = "rayon"))]
        {
            keypoints
                .iter()
                .filter_map(|&keypoint| {
                    Some((keypoint, self.steered_brief(&keypoint, smoothed).ok()?))
                })
                .unzip()
        }
        #[cfg(feature = "rayon")]
        {
            keypoints
                .par_iter()
                .filter_map(|&keypoint| {
                    Some((keypoint, self.steered_brief(&keypoint, smoothed).ok()?))
                })
                .unzip()
        }
    }

    /// Computes the steered BRIEF descriptor: every pattern pair is rotated by
    /// the keypoint orientation and bit `i` is set when the first point of pair
    /// `i` is darker than the second.
    fn steered_brief(&self, keypoint: &KeyPoint, smoothed: &GrayFloatImage) -> Result<Descriptor, Error> {
        let mut output = BitArray::zeros();
        let (x, y) = keypoint.point;
        let (sin, cos) = keypoint.angle.sin_cos();
        let width = smoothed.width() as isize;
        let height = smoothed.height() as isize;
        let sample = |(px, py): (f32, f32)| -> Result<f32, Error> {
            let sx = (x + px * cos - py * sin).round() as isize;
            let sy = (y + px * sin + py * cos).round() as isize;
            if !(0..width).contains(&sx) || !(0..height).contains(&sy) {
                return Err(Error::SampleOutOfBounds {
                    x: sx,
                    y: sy,
                    width: width as usize,
                    height: height as usize,
                });
            }
            Ok(smoothed.get(sx as usize, sy as usize))
        };
        let bytes = output.bytes_mut();
        for (bit, &(first, second)) in brief_pattern().iter().enumerate() {
            if sample(first)? < sample(second)? {
                bytes[bit >> 3] |= 1 << (bit & 7);
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn textured() -> GrayFloatImage {
        let gray = GrayImage::from_fn(80, 80, |x, y| {
            Luma([((x * 37 + y * 91 + (x * y) % 13 * 7) % 251) as u8])
        });
        GrayFloatImage::from_gray(&gray)
    }

    fn keypoint(x: f32, y: f32) -> KeyPoint {
        KeyPoint {
            point: (x, y),
            response: 1.0,
            size: 31.0,
            octave: 0,
            angle: 0.0,
        }
    }

    #[test]
    fn descriptor_is_deterministic() {
        let image = textured();
        let orb = Orb::default();
        let (_, a) = orb.extract_descriptors(&image, &[keypoint(40.0, 40.0)]);
        let (_, b) = orb.extract_descriptors(&image, &[keypoint(40.0, 40.0)]);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0], b[0]);
    }

    #[test]
    fn out_of_bounds_keypoints_are_dropped() {
        let image = textured();
        let (kps, descriptors) =
            Orb::default().extract_descriptors(&image, &[keypoint(2.0, 2.0), keypoint(40.0, 40.0)]);
        assert_eq!(kps.len(), 1);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(kps[0].point, (40.0, 40.0));
    }
}
