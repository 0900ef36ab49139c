#![allow(dead_code)]

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
use pcb_inspect::{synth, InspectConfig, ReferenceModel};
use std::sync::Arc;

pub const WIDTH: u32 = 480;
pub const HEIGHT: u32 = 360;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init_timed();
}

pub fn config() -> InspectConfig {
    InspectConfig::seeded(42)
}

pub fn board() -> RgbImage {
    synth::synthetic_board(WIDTH, HEIGHT, 11)
}

/// Paints a rectangle of bare solder mask so the surroundings of a defect
/// are known exactly.
pub fn clear(image: &mut RgbImage, x: i32, y: i32, width: u32, height: u32) {
    draw_filled_rect_mut(image, Rect::at(x, y).of_size(width, height), synth::BOARD_COLOR);
}

pub fn fill(image: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, color: [u8; 3]) {
    draw_filled_rect_mut(image, Rect::at(x, y).of_size(width, height), Rgb(color));
}

pub fn reference(image: &RgbImage) -> Arc<ReferenceModel> {
    Arc::new(
        ReferenceModel::from_image(image::DynamicImage::ImageRgb8(image.clone()), &config())
            .expect("reference builds"),
    )
}
