use std::path::PathBuf;

/// An image could not be turned into pixels to inspect.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image has no pixels")]
    Empty,
}

/// The test image could not be registered onto the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AlignmentFailure {
    #[error("no keypoints were found in the test image")]
    NoFeatures,
    #[error("only {found} matches survived filtering, at least 4 are needed")]
    InsufficientMatches { found: usize },
    #[error("no valid homography could be estimated")]
    DegenerateHomography,
}

/// Why a single inspection did not produce a result.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("alignment failed: {0}")]
    Alignment(#[from] AlignmentFailure),
}
