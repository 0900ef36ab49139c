//! Registration of a test image onto the reference.
//!
//! Features of the test image are matched symmetrically against the
//! reference index, the strongest matches go through ARRSAC with the
//! normalized DLT estimator, the winning homography is refit on its inliers
//! and finally the test image is warped into the reference grid.

use crate::{
    color,
    reference::{FeatureIndex, ReferenceModel},
    warp::{warp_perspective, AlignedImage},
    AlignmentFailure, InspectConfig,
};
use arrsac::Arrsac;
use bitarray::Hamming;
use homography::{Dlt, Homography};
use image::RgbImage;
use log::*;
use orb::Descriptor;
use pcb_core::{sample_consensus::Consensus, DescriptorMatch, FeatureMatch, KeyPoint};
use rand::RngCore;
use space::{Knn, LinearKnn};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Fewest correspondences that determine a homography.
const MIN_CORRESPONDENCES: usize = 4;

/// The outcome of registering one test image.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub aligned: AlignedImage,
    /// Maps test image coordinates into reference coordinates.
    pub transform: Homography,
    /// Matches handed to the consensus.
    pub matches: usize,
    /// Matches consistent with `transform`.
    pub inliers: usize,
}

/// The Hamming-nearest neighbour in `train` of every query, with its distance.
fn nearest(queries: &[Descriptor], train: &[Descriptor]) -> Vec<Option<(usize, u32)>> {
    let knn = LinearKnn {
        metric: Hamming,
        iter: train.iter(),
    };
    let lookup = |query: &Descriptor| {
        knn.knn(query, 1)
            .into_iter()
            .next()
            .map(|neighbor| (neighbor.index, neighbor.distance))
    };
    #[cfg(not(feature = "rayon"))]
    {
        queries.iter().map(lookup).collect()
    }
    #[cfg(feature = "rayon")]
    {
        queries.par_iter().map(lookup).collect()
    }
}

/// Cross-checked matching.
///
/// A pair is kept only if the test descriptor is the nearest to the reference
/// descriptor and the reference descriptor is also the nearest to the test
/// descriptor. `query` indexes `reference`, `train` indexes `test`.
pub fn symmetric_matches(reference: &[Descriptor], test: &[Descriptor]) -> Vec<DescriptorMatch> {
    let forward = nearest(reference, test);
    let reverse = nearest(test, reference);
    forward
        .into_iter()
        .enumerate()
        .filter_map(|(query, best)| {
            let (train, distance) = best?;
            (reverse[train].map(|(back, _)| back) == Some(query)).then(|| DescriptorMatch {
                query,
                train,
                distance,
            })
        })
        .collect()
}

/// Sorts by distance (stable) and keeps the best `floor(len * retention)`.
pub fn retain_best(matches: &mut Vec<DescriptorMatch>, retention: f64) {
    matches.sort_by_key(|m| m.distance);
    let keep = (matches.len() as f64 * retention).floor() as usize;
    matches.truncate(keep);
}

/// Fits the homography taking test points onto reference points.
///
/// Returns the model and the number of its inliers.
fn estimate_transform<C>(
    correspondences: &[FeatureMatch<KeyPoint>],
    consensus: &mut C,
) -> Result<(Homography, usize), AlignmentFailure>
where
    C: Consensus<Dlt, FeatureMatch<KeyPoint>>,
{
    let estimator = Dlt::new();
    let (model, inliers) = consensus
        .model_inliers(&estimator, correspondences.iter().copied())
        .ok_or(AlignmentFailure::DegenerateHomography)?;
    let inliers: Vec<usize> = inliers.into_iter().collect();
    if inliers.len() < MIN_CORRESPONDENCES {
        debug!("Consensus found only {} inliers", inliers.len());
        return Err(AlignmentFailure::DegenerateHomography);
    }
    let refit = estimator.from_matches(inliers.iter().map(|&ix| correspondences[ix]));
    let transform = match refit {
        Some(refit) => refit,
        None => {
            debug!("Refit on {} inliers was degenerate, keeping sample model", inliers.len());
            model
        }
    };
    Ok((transform, inliers.len()))
}

/// Registers `test` onto the reference and resamples it into the reference grid.
pub fn align<R: RngCore>(
    test: &RgbImage,
    reference: &ReferenceModel,
    config: &InspectConfig,
    rng: R,
) -> Result<Alignment, AlignmentFailure> {
    let features = FeatureIndex::extract(&color::to_gray(test), config);
    if features.is_empty() {
        return Err(AlignmentFailure::NoFeatures);
    }

    let reference_features = reference.features();
    let mut matches = symmetric_matches(&reference_features.descriptors, &features.descriptors);
    let symmetric = matches.len();
    retain_best(&mut matches, config.match_retention);
    debug!(
        "{} test keypoints, {} symmetric matches, {} retained",
        features.len(),
        symmetric,
        matches.len()
    );
    if matches.len() < MIN_CORRESPONDENCES {
        return Err(AlignmentFailure::InsufficientMatches {
            found: matches.len(),
        });
    }

    let correspondences: Vec<FeatureMatch<KeyPoint>> = matches
        .iter()
        .map(|m| {
            FeatureMatch(
                KeyPoint::from_image_point(&features.keypoints[m.train]),
                KeyPoint::from_image_point(&reference_features.keypoints[m.query]),
            )
        })
        .collect();
    let mut consensus = Arrsac::new(config.ransac_threshold, rng);
    let (transform, inliers) = estimate_transform(&correspondences, &mut consensus)?;
    debug!("Homography {:?} with {} inliers", transform.matrix(), inliers);

    let aligned = warp_perspective(test, &transform, reference.dimensions())
        .ok_or(AlignmentFailure::DegenerateHomography)?;
    Ok(Alignment {
        aligned,
        transform,
        matches: correspondences.len(),
        inliers,
    })
}
