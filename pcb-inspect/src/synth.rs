//! Synthetic boards and defects.
//!
//! The generators here produce a golden image and corrupted copies of it with
//! the kinds of damage the classifier knows about. They feed the `generate`
//! command of the CLI and the tests.

use crate::color;
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{
        draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
    },
    point::Point,
    rect::Rect,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Solder mask green.
pub const BOARD_COLOR: Rgb<u8> = Rgb([25, 50, 20]);
pub const SCRATCH_COLOR: Rgb<u8> = Rgb([220, 220, 220]);
pub const SCRATCH_THICKNESS: f32 = 4.0;
/// Side of the discolored square.
pub const DISCOLOR_SIZE: u32 = 100;
/// Hue rotation of a discoloration in half degrees.
pub const DISCOLOR_HUE_SHIFT: u8 = 40;
pub const DISCOLOR_VALUE_DROP: u8 = 50;
/// Offset of the clean, shifted test image.
pub const CLEAN_SHIFT: (i32, i32) = (2, 2);

const COPPER: Rgb<u8> = Rgb([184, 115, 51]);
const SILVER: Rgb<u8> = Rgb([200, 200, 200]);
const PART_COLORS: [Rgb<u8>; 5] = [
    Rgb([30, 30, 30]),
    Rgb([210, 180, 140]),
    Rgb([150, 100, 50]),
    Rgb([40, 60, 160]),
    Rgb([120, 200, 100]),
];

/// Uniform integer in `low..=high`, or `low` if the range is empty.
fn pick(rng: &mut impl Rng, low: i32, high: i32) -> i32 {
    if high <= low {
        low
    } else {
        rng.gen_range(low..=high)
    }
}

/// A textured board: traces, vias and rectangular parts with pads.
///
/// The same seed always gives the same board.
pub fn synthetic_board(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut board = RgbImage::from_pixel(width, height, BOARD_COLOR);
    let (w, h) = (width as i32, height as i32);
    let area = width as usize * height as usize;

    for _ in 0..area / 6000 {
        let mut from = (pick(&mut rng, 0, w - 1) as f32, pick(&mut rng, 0, h - 1) as f32);
        for _ in 0..3 {
            let length = pick(&mut rng, 20, 120) as f32;
            let to = if rng.gen() {
                (from.0 + length * if rng.gen() { 1.0 } else { -1.0 }, from.1)
            } else {
                (from.0, from.1 + length * if rng.gen() { 1.0 } else { -1.0 })
            };
            draw_thick_line(&mut board, from, to, 2.0, COPPER);
            from = to;
        }
    }

    for _ in 0..area / 3000 {
        let center = (pick(&mut rng, 0, w - 1), pick(&mut rng, 0, h - 1));
        let radius = pick(&mut rng, 2, 4);
        draw_filled_circle_mut(&mut board, center, radius, SILVER);
        draw_filled_circle_mut(&mut board, center, radius / 2, Rgb([10, 10, 10]));
    }

    for _ in 0..area / 2500 {
        let part_w = pick(&mut rng, 8, 40) as u32;
        let part_h = pick(&mut rng, 8, 40) as u32;
        let x = pick(&mut rng, 0, w - part_w as i32);
        let y = pick(&mut rng, 0, h - part_h as i32);
        let color = PART_COLORS[rng.gen_range(0..PART_COLORS.len())];
        draw_filled_rect_mut(&mut board, Rect::at(x, y).of_size(part_w, part_h), color);
        // Pads along the long sides.
        let pads = (part_w.max(part_h) / 6).max(1) as i32;
        for i in 0..pads {
            if part_w >= part_h {
                let px = x + 2 + i * 6;
                draw_filled_rect_mut(&mut board, Rect::at(px, y - 3).of_size(3, 3), SILVER);
                draw_filled_rect_mut(&mut board, Rect::at(px, y + part_h as i32).of_size(3, 3), SILVER);
            } else {
                let py = y + 2 + i * 6;
                draw_filled_rect_mut(&mut board, Rect::at(x - 3, py).of_size(3, 3), SILVER);
                draw_filled_rect_mut(&mut board, Rect::at(x + part_w as i32, py).of_size(3, 3), SILVER);
            }
        }
    }
    board
}

/// Draws a straight line of the given thickness as a filled quadrilateral.
pub fn draw_thick_line(
    image: &mut RgbImage,
    from: (f32, f32),
    to: (f32, f32),
    thickness: f32,
    color: Rgb<u8>,
) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length < 1.0 {
        let radius = (thickness / 2.0).round() as i32;
        draw_filled_circle_mut(image, (from.0.round() as i32, from.1.round() as i32), radius, color);
        return;
    }
    if thickness <= 1.0 {
        draw_line_segment_mut(image, from, to, color);
        return;
    }
    let half = thickness / 2.0;
    let (nx, ny) = (-dy / length * half, dx / length * half);
    let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
    let polygon = [
        corner(from.0 + nx, from.1 + ny),
        corner(to.0 + nx, to.1 + ny),
        corner(to.0 - nx, to.1 - ny),
        corner(from.0 - nx, from.1 - ny),
    ];
    if polygon[0] == polygon[3] {
        draw_line_segment_mut(image, from, to, color);
    } else {
        draw_polygon_mut(image, &polygon, color);
    }
}

/// Rotates the hue and lowers the value of a square patch in place.
pub fn discolor_patch(image: &mut RgbImage, x: u32, y: u32, size: u32, hue_shift: u8, value_drop: u8) {
    let right = (x + size).min(image.width());
    let bottom = (y + size).min(image.height());
    for py in y..bottom {
        for px in x..right {
            let pixel = image.get_pixel_mut(px, py);
            let [hue, saturation, value] = color::to_hsv(*pixel);
            let hue = ((hue as u16 + hue_shift as u16) % 180) as u8;
            *pixel = color::from_hsv([hue, saturation, value.saturating_sub(value_drop)]);
        }
    }
}

/// Three light grey 4 px lines near the middle of the board.
pub fn scratch(image: &RgbImage, rng: &mut impl Rng) -> RgbImage {
    let mut out = image.clone();
    let (w, h) = (image.width() as f32, image.height() as f32);
    for _ in 0..3 {
        let x1 = pick(rng, (w * 0.2) as i32, (w * 0.8) as i32);
        let y1 = pick(rng, (h * 0.2) as i32, (h * 0.8) as i32);
        let x2 = x1 + rng.gen_range(-50..=50);
        let y2 = y1 + rng.gen_range(-50..=50);
        draw_thick_line(
            &mut out,
            (x1 as f32, y1 as f32),
            (x2 as f32, y2 as f32),
            SCRATCH_THICKNESS,
            SCRATCH_COLOR,
        );
    }
    out
}

/// Paints two 30 to 60 px rectangles with the board color.
pub fn missing_component(image: &RgbImage, rng: &mut impl Rng) -> RgbImage {
    let mut out = image.clone();
    let (w, h) = (image.width() as i32, image.height() as i32);
    let margin = 100.min(w.min(h) / 4);
    for _ in 0..2 {
        let x = pick(rng, margin, w - margin);
        let y = pick(rng, margin, h - margin);
        let rect_w = rng.gen_range(30..=60);
        let rect_h = rng.gen_range(30..=60);
        draw_filled_rect_mut(&mut out, Rect::at(x, y).of_size(rect_w, rect_h), BOARD_COLOR);
    }
    out
}

/// Burns a 100 x 100 patch: hue rotated by 40, value lowered by 50.
pub fn discoloration(image: &RgbImage, rng: &mut impl Rng) -> RgbImage {
    let mut out = image.clone();
    let (w, h) = (image.width() as i32, image.height() as i32);
    let size = DISCOLOR_SIZE as i32;
    let margin = 100.min(w.min(h) / 4);
    let x = pick(rng, margin, w - size - margin).max(0);
    let y = pick(rng, margin, h - size - margin).max(0);
    discolor_patch(
        &mut out,
        x as u32,
        y as u32,
        DISCOLOR_SIZE,
        DISCOLOR_HUE_SHIFT,
        DISCOLOR_VALUE_DROP,
    );
    out
}

/// Translates the image by `(dx, dy)`, the uncovered border is black.
pub fn shifted(image: &RgbImage, dx: i32, dy: i32) -> RgbImage {
    let (w, h) = (image.width() as i32, image.height() as i32);
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let (sx, sy) = (x as i32 - dx, y as i32 - dy);
        if sx >= 0 && sy >= 0 && sx < w && sy < h {
            *image.get_pixel(sx as u32, sy as u32)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// The four test images written next to a golden image, with their file names.
pub fn generate_dataset(image: &RgbImage, rng: &mut impl Rng) -> Vec<(&'static str, RgbImage)> {
    vec![
        ("test_scratch.png", scratch(image, rng)),
        ("test_missing.png", missing_component(image, rng)),
        ("test_discolor.png", discoloration(image, rng)),
        ("test_clean.png", shifted(image, CLEAN_SHIFT.0, CLEAN_SHIFT.1)),
    ]
}
