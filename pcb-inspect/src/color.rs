//! Color conversions shared by the segmentation and the classifier.
//!
//! Gray and HSV values follow the 8-bit conventions of OpenCV so that the
//! thresholds in [`crate::config`] keep their usual meaning: gray is the
//! BT.601 luma rounded to the nearest integer, hue is in half degrees
//! (0-179) and saturation and value span 0-255.

use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::{FromColor, Hsv, RgbHue, Srgb};

// BT.601 weights in 14 bit fixed point.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const WEIGHT_SHIFT: u32 = 14;

/// Luma of one pixel.
#[inline]
pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    let sum = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT;
    ((sum + (1 << (WEIGHT_SHIFT - 1))) >> WEIGHT_SHIFT) as u8
}

pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.get_pixel(x, y).0)])
    })
}

/// HSV of one pixel as `[hue, saturation, value]`.
pub fn to_hsv(Rgb([r, g, b]): Rgb<u8>) -> [u8; 3] {
    let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());
    let saturation = (hsv.saturation * 255.0).round() as u8;
    let value = (hsv.value * 255.0).round() as u8;
    if saturation == 0 {
        return [0, 0, value];
    }
    let hue = (hsv.hue.to_positive_degrees() / 2.0).round() as u32 % 180;
    [hue as u8, saturation, value]
}

/// Inverse of [`to_hsv`], hue in half degrees.
pub fn from_hsv([hue, saturation, value]: [u8; 3]) -> Rgb<u8> {
    let hsv = Hsv::new(
        RgbHue::from_degrees(hue as f32 * 2.0),
        saturation as f32 / 255.0,
        value as f32 / 255.0,
    );
    let rgb: Srgb<u8> = Srgb::from_color(hsv).into_format();
    Rgb([rgb.red, rgb.green, rgb.blue])
}

/// Mean hue, saturation and value over all pixels of `image`.
///
/// Hue is averaged linearly, so reds on both sides of the wrap point average
/// to a mid hue.
pub fn mean_hsv(image: &RgbImage) -> [f64; 3] {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return [0.0; 3];
    }
    let mut sums = [0u64; 3];
    for &pixel in image.pixels() {
        for (sum, channel) in sums.iter_mut().zip(to_hsv(pixel)) {
            *sum += channel as u64;
        }
    }
    sums.map(|sum| sum as f64 / count as f64)
}
