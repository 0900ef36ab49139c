use crate::{
    align::{align, Alignment},
    classify::{classify, ClassificationRules},
    region::{DefectRecord, DefectRegion},
    segment::segment,
    warp::AlignedImage,
    InspectConfig, InspectError, LoadError, ReferenceModel,
};
use homography::Homography;
use image::{imageops, DynamicImage, RgbImage};
use log::*;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Everything one inspection found out about a test image.
#[derive(Debug, Clone)]
pub struct InspectionResult {
    /// The test image in the reference frame.
    pub aligned: AlignedImage,
    /// Maps test image coordinates into reference coordinates.
    pub transform: Homography,
    /// Classified regions, top to bottom then left to right.
    pub defects: Vec<DefectRegion>,
    /// Matches handed to the consensus.
    pub matches: usize,
    /// Matches consistent with `transform`.
    pub inliers: usize,
}

impl InspectionResult {
    /// No defect was found.
    pub fn passed(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn records(&self) -> Vec<DefectRecord> {
        self.defects.iter().map(DefectRegion::record).collect()
    }
}

/// Runs the full pipeline against one shared reference.
///
/// The inspector only reads its reference, so a single instance can serve
/// any number of threads. Every inspection draws from its own consensus RNG.
#[derive(Debug, Clone)]
pub struct Inspector {
    reference: Arc<ReferenceModel>,
    config: InspectConfig,
    rules: ClassificationRules,
}

/// The consensus RNG of one inspection.
fn consensus_rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

fn load(path: &Path) -> Result<DynamicImage, LoadError> {
    image::open(path).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

impl Inspector {
    /// Loads the reference image at `reference_path`.
    pub fn new(reference_path: impl AsRef<Path>, config: InspectConfig) -> Result<Self, LoadError> {
        let reference = ReferenceModel::initialize(reference_path, &config)?;
        Ok(Self::from_reference(Arc::new(reference), config))
    }

    pub fn from_reference(reference: Arc<ReferenceModel>, config: InspectConfig) -> Self {
        Self {
            reference,
            rules: ClassificationRules::from_config(&config),
            config,
        }
    }

    /// Replaces the classification table.
    pub fn with_rules(self, rules: ClassificationRules) -> Self {
        Self { rules, ..self }
    }

    pub fn reference(&self) -> &Arc<ReferenceModel> {
        &self.reference
    }

    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Inspects one image with the configured seed.
    pub fn inspect(&self, test: &DynamicImage) -> Result<InspectionResult, InspectError> {
        self.inspect_with_rng(test, consensus_rng(self.config.seed))
    }

    pub fn inspect_with_rng<R: RngCore>(
        &self,
        test: &DynamicImage,
        rng: R,
    ) -> Result<InspectionResult, InspectError> {
        let test = test.to_rgb8();
        if test.width() == 0 || test.height() == 0 {
            return Err(LoadError::Empty.into());
        }
        self.inspect_rgb(&test, rng)
    }

    pub fn inspect_path(&self, path: impl AsRef<Path>) -> Result<InspectionResult, InspectError> {
        self.inspect(&load(path.as_ref())?)
    }

    fn inspect_rgb<R: RngCore>(&self, test: &RgbImage, rng: R) -> Result<InspectionResult, InspectError> {
        let Alignment {
            aligned,
            transform,
            matches,
            inliers,
        } = align(test, &self.reference, &self.config, rng)?;
        let mut defects = segment(self.reference.image(), &aligned, &self.config);
        for region in &mut defects {
            let b = region.bbox;
            let reference_roi = imageops::crop_imm(self.reference.image(), b.x, b.y, b.width, b.height).to_image();
            let test_roi = imageops::crop_imm(aligned.image(), b.x, b.y, b.width, b.height).to_image();
            let (kind, confidence) = classify(&reference_roi, &test_roi, &b, &self.rules);
            region.kind = kind;
            region.confidence = confidence;
            trace!("{} at {:?} ({:.2})", kind, b, confidence);
        }
        info!(
            "{} with {} defects ({} of {} matches inlying)",
            if defects.is_empty() { "PASS" } else { "FAIL" },
            defects.len(),
            inliers,
            matches
        );
        Ok(InspectionResult {
            aligned,
            transform,
            defects,
            matches,
            inliers,
        })
    }

    /// Inspects every image in `paths` independently.
    ///
    /// A failure only affects its own entry. The output follows the input
    /// order. With a configured seed, image `i` uses `seed + i`.
    pub fn inspect_batch<P>(&self, paths: &[P]) -> Vec<(PathBuf, Result<InspectionResult, InspectError>)>
    where
        P: AsRef<Path> + Sync,
    {
        let run = |(index, path): (usize, &P)| {
            let path = path.as_ref();
            let rng = consensus_rng(self.config.seed.map(|seed| seed.wrapping_add(index as u64)));
            let result = load(path)
                .map_err(InspectError::from)
                .and_then(|image| self.inspect_with_rng(&image, rng));
            if let Err(e) = &result {
                warn!("Inspection of {} failed: {}", path.display(), e);
            }
            (path.to_path_buf(), result)
        };
        #[cfg(not(feature = "rayon"))]
        {
            paths.iter().enumerate().map(run).collect()
        }
        #[cfg(feature = "rayon")]
        {
            paths.par_iter().enumerate().map(run).collect()
        }
    }
}
