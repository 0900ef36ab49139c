use derive_more::{Deref, DerefMut};
use image::{imageops, DynamicImage, GrayImage, ImageBuffer, Luma};
use log::*;
use std::f32;

type GrayImageBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// The image type the detector works on.
///
/// A wrapper around a contiguous `f32` buffer holding intensities in `[0, 1]`.
/// Loading and saving still goes through the `image` crate; the filters the
/// detector needs are implemented directly on the raw buffer.
#[derive(Debug, Clone, Deref, DerefMut)]
pub struct GrayFloatImage(pub GrayImageBuffer);

impl GrayFloatImage {
    /// Create a unit float image from an 8-bit grayscale image.
    pub fn from_gray(gray: &GrayImage) -> Self {
        trace!("Converting a {} x {} 8-bit image", gray.width(), gray.height());
        Self(ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([f32::from(gray[(x, y)][0]) / 255f32])
        }))
    }

    /// Create a unit float image from the image crate's DynamicImage type.
    pub fn from_dynamic(input_image: &DynamicImage) -> Self {
        Self::from_gray(&input_image.to_luma8())
    }

    pub fn width(&self) -> usize {
        self.0.width() as usize
    }

    pub fn height(&self) -> usize {
        self.0.height() as usize
    }

    pub fn new(width: usize, height: usize) -> Self {
        Self(ImageBuffer::from_pixel(
            width as u32,
            height as u32,
            Luma([0.0]),
        ))
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.0.as_raw()[y * self.width() + x]
    }

    pub fn put(&mut self, x: usize, y: usize, pixel_value: f32) {
        let width = self.width();
        let raw: &mut [f32] = &mut self.0;
        raw[y * width + x] = pixel_value;
    }

    /// Resample to the given size with a triangle (bilinear) filter.
    pub fn resize(&self, width: usize, height: usize) -> Self {
        Self(imageops::resize(
            &self.0,
            width as u32,
            height as u32,
            imageops::FilterType::Triangle,
        ))
    }
}

/// Convolve every row with `kernel`, replicating the edge pixels.
pub fn horizontal_filter(image: &GrayImageBuffer, kernel: &[f32]) -> GrayImageBuffer {
    debug_assert!(kernel.len() % 2 == 1);
    let half = kernel.len() / 2;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut output = vec![0.0; width * height];
    let mut scratch = vec![0f32; width + half * 2];
    for (row_in, row_out) in image
        .as_raw()
        .chunks_exact(width)
        .zip(output.chunks_exact_mut(width))
    {
        scratch[..half].fill(row_in[0]);
        scratch[half..half + width].copy_from_slice(row_in);
        scratch[half + width..].fill(row_in[width - 1]);
        for (window, out) in scratch.windows(kernel.len()).zip(row_out.iter_mut()) {
            *out = window.iter().zip(kernel).map(|(a, b)| a * b).sum();
        }
    }
    GrayImageBuffer::from_raw(width as u32, height as u32, output)
        .expect("output buffer has exactly width * height pixels")
}

/// Convolve every column with `kernel`, replicating the edge pixels.
pub fn vertical_filter(image: &GrayImageBuffer, kernel: &[f32]) -> GrayImageBuffer {
    debug_assert!(kernel.len() % 2 == 1);
    let half = kernel.len() as isize / 2;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let raw = image.as_raw();
    let mut output = vec![0.0; width * height];
    for y in 0..height {
        let out_row = &mut output[y * width..(y + 1) * width];
        for (k, &weight) in kernel.iter().enumerate() {
            let sy = (y as isize + k as isize - half).clamp(0, height as isize - 1) as usize;
            let in_row = &raw[sy * width..(sy + 1) * width];
            for (out, &value) in out_row.iter_mut().zip(in_row) {
                *out += weight * value;
            }
        }
    }
    GrayImageBuffer::from_raw(width as u32, height as u32, output)
        .expect("output buffer has exactly width * height pixels")
}

pub fn separable_filter(
    image: &GrayImageBuffer,
    h_kernel: &[f32],
    v_kernel: &[f32],
) -> GrayImageBuffer {
    let h = horizontal_filter(image, h_kernel);
    vertical_filter(&h, v_kernel)
}

/// The Gaussian function.
fn gaussian(x: f32, r: f32) -> f32 {
    ((2.0 * f32::consts::PI).sqrt() * r).recip() * (-x.powi(2) / (2.0 * r.powi(2))).exp()
}

/// Generate a normalized Gaussian kernel with standard deviation `r`.
pub fn gaussian_kernel(r: f32, kernel_size: usize) -> Vec<f32> {
    assert!(kernel_size % 2 == 1, "kernel_size must be odd");
    let half_width = (kernel_size / 2) as i32;
    let mut kernel: Vec<f32> = (-half_width..=half_width)
        .map(|i| gaussian(i as f32, r))
        .collect();
    let sum: f32 = kernel.iter().sum();
    for val in kernel.iter_mut() {
        *val /= sum;
    }
    kernel
}

/// Gaussian blur with an explicit (odd) kernel size, as ORB smooths with a
/// fixed 7x7 window before sampling descriptor pairs.
pub fn gaussian_blur(image: &GrayFloatImage, r: f32, kernel_size: usize) -> GrayFloatImage {
    assert!(r > 0.0, "sigma must be > 0.0");
    let kernel = gaussian_kernel(r, kernel_size);
    GrayFloatImage(separable_filter(image, &kernel, &kernel))
}
