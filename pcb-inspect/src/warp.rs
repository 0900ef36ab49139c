use homography::Homography;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// A test image resampled onto the reference pixel grid.
///
/// `coverage` is 255 where the pixel was sampled from inside the test image
/// and 0 where the inverse mapping fell outside of it (those pixels are black).
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedImage {
    image: RgbImage,
    coverage: GrayImage,
}

impl AlignedImage {
    /// An image that covers the whole grid.
    pub fn fully_covered(image: RgbImage) -> Self {
        let coverage = GrayImage::from_pixel(image.width(), image.height(), Luma([255]));
        Self { image, coverage }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn coverage(&self) -> &GrayImage {
        &self.coverage
    }

    #[inline]
    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        self.coverage.get_pixel(x, y)[0] != 0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Warps `source` into a `width` x `height` grid.
///
/// `transform` maps source coordinates into grid coordinates; every grid
/// pixel is pulled back through its inverse and sampled bilinearly. Grid
/// pixels whose four neighbours are not all inside `source` stay black and
/// uncovered. Returns `None` if the transform cannot be inverted.
pub fn warp_perspective(
    source: &RgbImage,
    transform: &Homography,
    (width, height): (u32, u32),
) -> Option<AlignedImage> {
    let projection = projection(transform)?;
    let mut image = RgbImage::new(width, height);
    warp_into(source, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut image);

    let (source_width, source_height) = source.dimensions();
    let footprint = GrayImage::from_pixel(source_width, source_height, Luma([255]));
    let mut coverage = GrayImage::new(width, height);
    warp_into(&footprint, &projection, Interpolation::Bilinear, Luma([0]), &mut coverage);
    Some(AlignedImage { image, coverage })
}

fn projection(transform: &Homography) -> Option<Projection> {
    let m = transform.matrix();
    let mut entries = [0f32; 9];
    for (i, entry) in entries.iter_mut().enumerate() {
        *entry = m[(i / 3, i % 3)] as f32;
    }
    if !entries.iter().all(|v| v.is_finite()) {
        return None;
    }
    Projection::from_matrix(entries)
}
