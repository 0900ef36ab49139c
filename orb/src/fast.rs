use crate::image::GrayFloatImage;
use crate::Orb;
use log::*;

/// Bresenham circle of radius 3 around the candidate pixel, clockwise from the top.
const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Minimum length of the contiguous arc for FAST-9.
const ARC_LENGTH: usize = 9;

/// A FAST corner on one pyramid level, in that level's pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Corner {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

/// Score of a FAST-9 corner or `None` if the segment test fails.
///
/// The score is the summed absolute difference between the center and the
/// circle pixels that exceed the threshold on the winning side.
fn corner_score(image: &GrayFloatImage, x: usize, y: usize, threshold: f32) -> Option<f32> {
    let center = image.get(x, y);
    let sample = |i: usize| {
        let (dx, dy) = CIRCLE[i];
        image.get((x as isize + dx) as usize, (y as isize + dy) as usize)
    };

    // Any arc of nine contiguous pixels covers at least two compass points.
    let compass = [sample(0), sample(4), sample(8), sample(12)];
    let brighter = compass.iter().filter(|&&v| v > center + threshold).count();
    let darker = compass.iter().filter(|&&v| v < center - threshold).count();
    if brighter < 2 && darker < 2 {
        return None;
    }

    let mut ring = [0f32; 16];
    for (i, value) in ring.iter_mut().enumerate() {
        *value = sample(i);
    }

    let longest_run = |predicate: &dyn Fn(f32) -> bool| {
        let mut best = 0;
        let mut run = 0;
        // Walk the ring twice to catch arcs that wrap around.
        for i in 0..32 {
            if predicate(ring[i % 16]) {
                run += 1;
                best = usize::max(best, run);
            } else {
                run = 0;
            }
        }
        best.min(16)
    };

    let is_bright = |v: f32| v > center + threshold;
    let is_dark = |v: f32| v < center - threshold;
    if longest_run(&is_bright) >= ARC_LENGTH {
        Some(ring.iter().map(|&v| (v - center - threshold).max(0.0)).sum())
    } else if longest_run(&is_dark) >= ARC_LENGTH {
        Some(ring.iter().map(|&v| (center - threshold - v).max(0.0)).sum())
    } else {
        None
    }
}

impl Orb {
    /// Detect FAST-9 corners at least `edge_threshold` pixels from the border,
    /// keeping only corners whose score is a strict maximum of their 3x3
    /// neighbourhood.
    pub(crate) fn detect_corners(&self, image: &GrayFloatImage) -> Vec<Corner> {
        let width = image.width();
        let height = image.height();
        let border = self.edge_threshold.max(3);
        if width <= 2 * border || height <= 2 * border {
            return vec![];
        }
        let threshold = f32::from(self.fast_threshold) / 255.0;

        let mut scores = vec![0f32; width * height];
        for y in border..height - border {
            for x in border..width - border {
                if let Some(score) = corner_score(image, x, y, threshold) {
                    scores[y * width + x] = score;
                }
            }
        }

        let mut corners = vec![];
        for y in border..height - border {
            for x in border..width - border {
                let score = scores[y * width + x];
                if score <= 0.0 {
                    continue;
                }
                // Ties are broken towards the first pixel in raster order.
                let is_maximum = (-1isize..=1).all(|dy| {
                    (-1isize..=1).all(|dx| {
                        if dx == 0 && dy == 0 {
                            return true;
                        }
                        let nx = (x as isize + dx) as usize;
                        let ny = (y as isize + dy) as usize;
                        let neighbour = scores[ny * width + nx];
                        let before = dy < 0 || (dy == 0 && dx < 0);
                        if before {
                            score > neighbour
                        } else {
                            score >= neighbour
                        }
                    })
                });
                if is_maximum {
                    corners.push(Corner { x, y, score });
                }
            }
        }
        debug!(
            "FAST found {} corners on a {} x {} level",
            corners.len(),
            width,
            height
        );
        corners
    }
}
