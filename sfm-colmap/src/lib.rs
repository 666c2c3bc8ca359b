//! # sfm-colmap
//!
//! Everything that touches the external COLMAP tool: the expected on-disk
//! layout beneath a dataset root ([`DatasetWorkspace`]), validated engine
//! options ([`ColmapOptions`]), a reader for sparse reconstructions exported
//! as text ([`load_sparse_model`]), and the [`ColmapEngine`] that shells out
//! to the `colmap` executable.
//!
//! Callers treat the engine as opaque: they hand it a workspace and a
//! recompute flag and get back a [`sfm_core::ReconstructionResult`].

mod engine;
mod model;
mod options;
mod workspace;

pub use engine::*;
pub use model::*;
pub use options::*;
pub use workspace::*;
