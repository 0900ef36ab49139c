use crate::{
    classify::DefectKind,
    color,
    region::{BoundingBox, DefectRegion},
    warp::AlignedImage,
    InspectConfig,
};
use image::{GrayImage, Luma, RgbImage};
use imageproc::{
    contours::{find_contours, BorderType, Contour},
    distance_transform::Norm,
    morphology::{dilate, open},
    point::Point,
};
use log::*;

/// Binary map of the pixels that changed, after cleanup.
///
/// The gray level of the per-channel absolute difference is thresholded,
/// pixels without coverage in `aligned` are cleared, the result is opened to
/// drop speckles and dilated once to merge nearby fragments. Set pixels are
/// 255, the rest 0.
pub fn difference_mask(reference: &RgbImage, aligned: &AlignedImage, config: &InspectConfig) -> GrayImage {
    debug_assert_eq!(reference.dimensions(), aligned.dimensions());
    let (width, height) = reference.dimensions();
    let test = aligned.image();
    let raw = GrayImage::from_fn(width, height, |x, y| {
        if !aligned.is_covered(x, y) {
            return Luma([0]);
        }
        let a = reference.get_pixel(x, y).0;
        let b = test.get_pixel(x, y).0;
        let diff = [a[0].abs_diff(b[0]), a[1].abs_diff(b[1]), a[2].abs_diff(b[2])];
        if color::luma(diff) > config.diff_threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let opened = open(&raw, Norm::LInf, config.morph_radius);
    dilate(&opened, Norm::LInf, config.morph_radius)
}

/// Area and centroid of a closed polygon through the given pixel centers.
///
/// A polygon without area (a single pixel or a line) gets the mean of its
/// points as centroid.
fn polygon_moments(points: &[Point<i32>]) -> (f64, (f64, f64)) {
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let cross = (a.x * b.y - b.x * a.y) as f64;
        twice_area += cross;
        cx += (a.x + b.x) as f64 * cross;
        cy += (a.y + b.y) as f64 * cross;
    }
    if twice_area == 0.0 {
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.x as f64).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.y as f64).sum::<f64>() / n;
        return (0.0, (mean_x, mean_y));
    }
    (
        twice_area.abs() / 2.0,
        (cx / (3.0 * twice_area), cy / (3.0 * twice_area)),
    )
}

fn outer_region(contour: &Contour<i32>) -> DefectRegion {
    // Contours are traced on a mask with a one pixel frame.
    let points: Vec<Point<i32>> = contour
        .points
        .iter()
        .map(|p| Point::new(p.x - 1, p.y - 1))
        .collect();
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
    let bbox = BoundingBox::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    );
    let (area, centroid) = polygon_moments(&points);
    DefectRegion {
        bbox,
        area,
        center: bbox.center(),
        centroid,
        kind: DefectKind::Defect,
        confidence: 0.0,
    }
}

/// External regions of a binary mask whose outer contour encloses at least
/// `min_area`.
///
/// Anything inside the hole of another region belongs to that region. The
/// area is the one of the polygon through the centers of the outer border
/// pixels, so a `n` x `n` square has `(n - 1)^2`. Regions come out ordered
/// by their bounding box, top to bottom and then left to right. They are not
/// classified yet.
pub fn regions(mask: &GrayImage, min_area: u32) -> Vec<DefectRegion> {
    let (width, height) = mask.dimensions();
    // Borders starting in the first column are only found with a frame around
    // the mask.
    let framed = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        if x == 0 || y == 0 || x > width || y > height {
            Luma([0])
        } else {
            *mask.get_pixel(x - 1, y - 1)
        }
    });
    let contours = find_contours::<i32>(&framed);
    let mut external = 0;
    let mut regions: Vec<DefectRegion> = contours
        .iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .inspect(|_| external += 1)
        .map(outer_region)
        .filter(|region| region.area >= min_area as f64)
        .collect();
    regions.sort_by_key(|region| (region.bbox.y, region.bbox.x));
    trace!(
        "{} contours, {} external, {} enclosing at least {}",
        contours.len(),
        external,
        regions.len(),
        min_area
    );
    regions
}

/// Finds the regions where `aligned` differs from `reference`.
pub fn segment(reference: &RgbImage, aligned: &AlignedImage, config: &InspectConfig) -> Vec<DefectRegion> {
    regions(
        &difference_mask(reference, aligned, config),
        config.min_region_area,
    )
}
