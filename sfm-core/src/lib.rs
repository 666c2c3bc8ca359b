//! # sfm-core
//!
//! Data types shared by the structure-from-motion session crates. This covers
//! the contract between a reconstruction engine and its consumers: pinhole
//! [`CameraIntrinsics`], rigid [`WorldToCamera`]/[`CameraToWorld`] poses, a
//! colored [`PointCloud`], the insertion-ordered [`CameraSet`], and the
//! [`ReconstructionResult`] a viewer reads once estimation completes.
//!
//! The crate deliberately contains no reconstruction algorithms; those live
//! behind the engine boundary.

mod camera;
mod frustum;
mod point;
mod pose;
mod result;

pub use camera::*;
pub use frustum::*;
pub use point::*;
pub use pose::*;
pub use result::*;

pub use nalgebra;
