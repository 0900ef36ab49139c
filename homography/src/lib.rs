//! Planar homography estimation.
//!
//! [`Dlt`] implements the normalized
//! [direct linear transform](https://en.wikipedia.org/wiki/Direct_linear_transformation)
//! from Hartley and Zisserman. It is an [`Estimator`] over [`FeatureMatch`]es, so
//! it can be handed to any [`sample_consensus`](pcb_core::sample_consensus)
//! consensus algorithm (ARRSAC, RANSAC, ...). The estimated [`Homography`]
//! maps the first point of every match onto the second and its
//! [`Model::residual`] is the reprojection error in pixels.

#![no_std]

use float_ord::FloatOrd;
#[allow(unused_imports)]
use num_traits::Float;
use pcb_core::{
    nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3},
    sample_consensus::{Estimator, Model},
    FeatureMatch, ImagePoint,
};

/// Smallest determinant magnitude a normalized homography may have.
pub const MIN_DETERMINANT: f64 = 1e-6;

/// Twice the smallest triangle area, in Hartley-normalized units, for a
/// minimal sample to count as non-collinear.
const MIN_SAMPLE_AREA: f64 = 1e-4;

/// A 3x3 projective transform between two image planes.
///
/// The matrix is kept normalized so that `h33 == 1` whenever that is possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// A pure translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self(Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0))
    }

    /// Normalizes `matrix` and returns it as a homography if it is not degenerate.
    ///
    /// Degenerate means non-finite entries or a determinant below [`MIN_DETERMINANT`]
    /// after normalization.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Option<Self> {
        let scale = matrix[(2, 2)];
        let normalized = if scale.abs() > 1e-12 {
            matrix / scale
        } else {
            let norm = matrix.norm();
            if norm == 0.0 {
                return None;
            }
            matrix / norm
        };
        let homography = Self(normalized);
        if homography.is_degenerate() {
            None
        } else {
            Some(homography)
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    pub fn is_degenerate(&self) -> bool {
        !self.0.iter().all(|v| v.is_finite()) || self.0.determinant().abs() < MIN_DETERMINANT
    }

    /// Projects a point through the homography.
    ///
    /// Returns `None` for points that map to infinity.
    pub fn transform_point(&self, point: Point2<f64>) -> Option<Point2<f64>> {
        let p = self.0 * Vector3::new(point.x, point.y, 1.0);
        if p.z.abs() < 1e-12 {
            return None;
        }
        Some(Point2::new(p.x / p.z, p.y / p.z))
    }

    pub fn inverse(&self) -> Option<Self> {
        self.0.try_inverse().and_then(Self::from_matrix)
    }

    /// Euclidean distance between the projection of `from` and `to`.
    pub fn reprojection_error(&self, from: Point2<f64>, to: Point2<f64>) -> f64 {
        self.transform_point(from)
            .map(|p| (p - to).norm())
            .unwrap_or(f64::INFINITY)
    }
}

impl<P> Model<FeatureMatch<P>> for Homography
where
    P: ImagePoint,
{
    fn residual(&self, data: &FeatureMatch<P>) -> f64 {
        let FeatureMatch(from, to) = data;
        self.reprojection_error(from.image_point(), to.image_point())
    }
}

/// Similarity transform that moves the centroid of the points to the origin
/// and scales their mean distance from it to `sqrt(2)`.
fn normalizing_transform(points: impl Iterator<Item = Point2<f64>> + Clone) -> Option<Matrix3<f64>> {
    let (count, sum) = points
        .clone()
        .fold((0usize, Vector3::zeros()), |(count, sum), p| {
            (count + 1, sum + Vector3::new(p.x, p.y, 0.0))
        });
    if count == 0 {
        return None;
    }
    let n = count as f64;
    let (cx, cy) = (sum.x / n, sum.y / n);
    let mean_distance = points
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_distance < 1e-12 {
        return None;
    }
    let s = core::f64::consts::SQRT_2 / mean_distance;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(transform: &Matrix3<f64>, p: Point2<f64>) -> Point2<f64> {
    Point2::new(
        transform[(0, 0)] * p.x + transform[(0, 2)],
        transform[(1, 1)] * p.y + transform[(1, 2)],
    )
}

/// Twice the signed area of the triangle `abc`.
fn doubled_area(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Returns true if any three of the four points are (nearly) collinear.
fn has_collinear_triple(points: &[Point2<f64>; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        doubled_area(points[a], points[b], points[c]).abs() < MIN_SAMPLE_AREA
    })
}

/// Normalized direct linear transform.
///
/// The homography is the eigenvector of `AᵀA` with the smallest eigenvalue,
/// where `A` stacks two rows per correspondence. `AᵀA` is accumulated directly
/// so no allocation is needed regardless of the number of matches.
#[derive(Copy, Clone, Debug)]
pub struct Dlt {
    pub epsilon: f64,
    pub iterations: usize,
}

impl Dlt {
    pub fn new() -> Self {
        Default::default()
    }

    /// Estimates a homography from four or more matches.
    ///
    /// Returns `None` if there are fewer than four matches, if a minimal sample
    /// has three collinear points, or if the result is degenerate.
    pub fn from_matches<I, P>(&self, data: I) -> Option<Homography>
    where
        I: Iterator<Item = FeatureMatch<P>> + Clone,
        P: ImagePoint,
    {
        let from_points = data.clone().map(|FeatureMatch(a, _)| a.image_point());
        let to_points = data.clone().map(|FeatureMatch(_, b)| b.image_point());
        let t_from = normalizing_transform(from_points.clone())?;
        let t_to = normalizing_transform(to_points.clone())?;

        let mut count = 0usize;
        let mut minimal = [Point2::origin(); 4];
        let mut minimal_to = [Point2::origin(); 4];
        let mut ata = SMatrix::<f64, 9, 9>::zeros();
        for (from, to) in from_points.zip(to_points) {
            let s = apply(&t_from, from);
            let d = apply(&t_to, to);
            if count < 4 {
                minimal[count] = s;
                minimal_to[count] = d;
            }
            count += 1;
            let r0 = SVector::<f64, 9>::from_column_slice(&[
                0.0,
                0.0,
                0.0,
                -s.x,
                -s.y,
                -1.0,
                d.y * s.x,
                d.y * s.y,
                d.y,
            ]);
            let r1 = SVector::<f64, 9>::from_column_slice(&[
                s.x,
                s.y,
                1.0,
                0.0,
                0.0,
                0.0,
                -d.x * s.x,
                -d.x * s.y,
                -d.x,
            ]);
            ata += r0 * r0.transpose() + r1 * r1.transpose();
        }
        if count < 4 {
            return None;
        }
        if count == 4 && (has_collinear_triple(&minimal) || has_collinear_triple(&minimal_to)) {
            return None;
        }

        let eigens = ata.try_symmetric_eigen(self.epsilon, self.iterations)?;
        let eigenvector = eigens
            .eigenvalues
            .iter()
            .enumerate()
            .min_by_key(|&(_, &n)| FloatOrd(n.abs()))
            .map(|(ix, _)| eigens.eigenvectors.column(ix).into_owned())?;
        // The eigenvector is the row-major flattening of the normalized homography.
        let normalized = Matrix3::from_row_slice(eigenvector.as_slice());
        let t_to_inverse = t_to.try_inverse()?;
        Homography::from_matrix(t_to_inverse * normalized * t_from)
    }
}

impl Default for Dlt {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
        }
    }
}

impl<P> Estimator<FeatureMatch<P>> for Dlt
where
    P: ImagePoint,
{
    type Model = Homography;
    type ModelIter = Option<Homography>;
    const MIN_SAMPLES: usize = 4;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch<P>> + Clone,
    {
        self.from_matches(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_core::KeyPoint;

    fn square_matches(h: &Homography) -> [FeatureMatch<KeyPoint>; 4] {
        [(0.0, 0.0), (100.0, 0.0), (100.0, 80.0), (0.0, 80.0)].map(|(x, y)| {
            let from = Point2::new(x, y);
            let to = h.transform_point(from).unwrap();
            FeatureMatch(KeyPoint(from), KeyPoint(to))
        })
    }

    #[test]
    fn recovers_translation() {
        let truth = Homography::translation(7.0, -4.0);
        let estimated = Dlt::new()
            .from_matches(square_matches(&truth).iter().copied())
            .unwrap();
        assert!((estimated.0 - truth.0).norm() < 1e-9);
    }

    #[test]
    fn rejects_collinear_sample() {
        let matches = [(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (0.0, 50.0)].map(|(x, y)| {
            FeatureMatch(KeyPoint::new(x, y), KeyPoint::new(x + 1.0, y))
        });
        assert!(Dlt::new().from_matches(matches.iter().copied()).is_none());
    }

    #[test]
    fn rejects_too_few_matches() {
        let truth = Homography::identity();
        let matches = square_matches(&truth);
        assert!(Dlt::new().from_matches(matches[..3].iter().copied()).is_none());
    }

    #[test]
    fn degenerate_matrix_is_rejected() {
        let singular = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0);
        assert!(Homography::from_matrix(singular).is_none());
        assert!(Homography::from_matrix(Matrix3::zeros()).is_none());
    }

    #[test]
    fn residual_is_pixel_distance() {
        let h = Homography::translation(3.0, 4.0);
        let m = FeatureMatch(KeyPoint::new(0.0, 0.0), KeyPoint::new(0.0, 0.0));
        assert!((h.residual(&m) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_undoes_transform() {
        let h = Homography(Matrix3::new(1.1, 0.05, 12.0, -0.03, 0.95, -8.0, 1e-4, -2e-4, 1.0));
        let inverse = h.inverse().unwrap();
        let p = Point2::new(321.0, 123.0);
        let back = inverse.transform_point(h.transform_point(p).unwrap()).unwrap();
        assert!((back - p).norm() < 1e-9);
    }
}
