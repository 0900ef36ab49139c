//! Reference based inspection of printed circuit boards.
//!
//! A known-good "golden" board is loaded once into a [`ReferenceModel`].
//! Every test image is then
//!
//! 1. registered onto the reference with ORB features, symmetric Hamming
//!    matching and an ARRSAC homography ([`align`]),
//! 2. compared pixel by pixel and cut into connected regions of change
//!    ([`segment`]),
//! 3. and every region is labelled by an ordered table of color and shape
//!    rules ([`classify`]).
//!
//! [`Inspector`] ties the stages together and runs batches in parallel when
//! the `rayon` feature is enabled.
//!
//! ```no_run
//! use pcb_inspect::{InspectConfig, Inspector};
//!
//! let inspector = Inspector::new("dataset/golden_master.png", InspectConfig::seeded(0))?;
//! let result = inspector.inspect_path("dataset/test_scratch.png")?;
//! for defect in &result.defects {
//!     println!("{} at {:?} ({:.2})", defect.kind, defect.bbox, defect.confidence);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod align;
pub mod classify;
pub mod color;
pub mod config;
mod error;
pub mod inspector;
pub mod reference;
pub mod region;
pub mod segment;
pub mod synth;
pub mod warp;

pub use align::Alignment;
pub use classify::{ClassificationRules, DefectKind, Rule};
pub use config::InspectConfig;
pub use error::{AlignmentFailure, InspectError, LoadError};
pub use homography::Homography;
pub use inspector::{InspectionResult, Inspector};
pub use reference::{FeatureIndex, ReferenceModel};
pub use region::{BoundingBox, DefectRecord, DefectRegion};
pub use warp::AlignedImage;
