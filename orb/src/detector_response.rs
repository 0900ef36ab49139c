use crate::image::GrayFloatImage;
use crate::Orb;

/// Half of the 7x7 block the Harris structure tensor is summed over.
const HARRIS_BLOCK_RADIUS: isize = 3;

impl Orb {
    /// Harris corner measure `det(M) - k * trace(M)^2` at `(x, y)`.
    ///
    /// Gradients are 3x3 Sobel responses. The caller guarantees the block and
    /// its Sobel support lie inside the image.
    pub(crate) fn harris_response(&self, image: &GrayFloatImage, x: usize, y: usize) -> f32 {
        let at = |x: isize, y: isize| image.get(x as usize, y as usize);
        let (mut sxx, mut syy, mut sxy) = (0f32, 0f32, 0f32);
        for dy in -HARRIS_BLOCK_RADIUS..=HARRIS_BLOCK_RADIUS {
            for dx in -HARRIS_BLOCK_RADIUS..=HARRIS_BLOCK_RADIUS {
                let px = x as isize + dx;
                let py = y as isize + dy;
                let ix = (at(px + 1, py - 1) + 2.0 * at(px + 1, py) + at(px + 1, py + 1))
                    - (at(px - 1, py - 1) + 2.0 * at(px - 1, py) + at(px - 1, py + 1));
                let iy = (at(px - 1, py + 1) + 2.0 * at(px, py + 1) + at(px + 1, py + 1))
                    - (at(px - 1, py - 1) + 2.0 * at(px, py - 1) + at(px + 1, py - 1));
                sxx += ix * ix;
                syy += iy * iy;
                sxy += ix * iy;
            }
        }
        let trace = sxx + syy;
        sxx * syy - sxy * sxy - self.harris_k * trace * trace
    }

    /// Orientation of the patch by the intensity centroid method.
    ///
    /// Returns the angle in radians of the vector from `(x, y)` to the
    /// intensity-weighted centroid of the circular patch around it.
    pub(crate) fn intensity_centroid_angle(&self, image: &GrayFloatImage, x: usize, y: usize) -> f32 {
        let radius = (self.patch_size / 2) as isize;
        let (mut m01, mut m10) = (0f32, 0f32);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let value = image.get((x as isize + dx) as usize, (y as isize + dy) as usize);
                m10 += dx as f32 * value;
                m01 += dy as f32 * value;
            }
        }
        m01.atan2(m10)
    }
}

#[cfg(test)]
mod tests {
    use crate::image::GrayFloatImage;
    use crate::Orb;
    use image::{GrayImage, Luma};

    #[test]
    fn corner_beats_edge_and_flat() {
        let gray = GrayImage::from_fn(48, 48, |x, y| {
            if x >= 24 && y >= 24 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let image = GrayFloatImage::from_gray(&gray);
        let orb = Orb::default();
        let corner = orb.harris_response(&image, 24, 24);
        let edge = orb.harris_response(&image, 36, 24);
        let flat = orb.harris_response(&image, 8, 8);
        assert!(corner > edge);
        assert!(corner > flat);
        assert!(flat.abs() < 1e-6);
    }

    #[test]
    fn centroid_points_towards_bright_side() {
        let gray = GrayImage::from_fn(64, 64, |x, _| if x > 32 { Luma([255]) } else { Luma([0]) });
        let image = GrayFloatImage::from_gray(&gray);
        let angle = Orb::default().intensity_centroid_angle(&image, 32, 32);
        assert!(angle.abs() < 1e-3);
    }
}
