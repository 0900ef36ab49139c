//! # PCB inspection core
//!
//! Common types for the PCB inspection crates. The feature detector, the
//! homography estimator and the inspection pipeline all exchange keypoints and
//! matches through this crate, so they can be combined without depending on
//! each other.
//!
//! The crate is `#![no_std]`. Geometry comes from [`nalgebra`] and the robust
//! estimation traits come from [`sample_consensus`]; both are re-exported so
//! downstream crates use the same versions.
//!
//! ## Coordinates
//!
//! All points are in pixel units of the image they were detected on. `+x`
//! points right and `+y` points down, with the origin at the top-left corner of
//! the top-left pixel's center, the same convention OpenCV uses for keypoints.
//!
//! ```text
//!   (0,0) ---> +x
//!     |
//!     |
//!     v +y
//! ```

#![no_std]

mod keypoint;
mod matches;

pub use keypoint::*;
pub use matches::*;
pub use nalgebra;
pub use sample_consensus;
