//! # sfm-session
//!
//! Session layer over a reconstruction engine: a [`ReconstructionSession`]
//! owns a dataset path and the latest [`sfm_core::ReconstructionResult`], and
//! runs estimation as a background job that is polled rather than awaited.
//! Also home to the on-disk [`SessionSettings`] and PLY export.

mod engine;
mod export;
mod session;
mod settings;
mod worker;

pub use engine::*;
pub use export::*;
pub use session::*;
pub use settings::*;
pub use worker::*;
