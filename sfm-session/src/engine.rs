//! Seam between a session and whatever produces reconstructions.

use crate::JobPanicked;
use sfm_colmap::{ColmapEngine, DatasetWorkspace, EngineError};
use sfm_core::ReconstructionResult;

/// Anything capable of reconstructing a dataset workspace.
///
/// Implementations run on a background thread, so they must be shareable and
/// must not hold references into the caller.
pub trait ReconstructionEngine: Send + Sync + 'static {
    fn estimate(
        &self,
        workspace: &DatasetWorkspace,
        recompute: bool,
    ) -> Result<ReconstructionResult, EngineError>;
}

impl ReconstructionEngine for ColmapEngine {
    fn estimate(
        &self,
        workspace: &DatasetWorkspace,
        recompute: bool,
    ) -> Result<ReconstructionResult, EngineError> {
        ColmapEngine::estimate(self, workspace, recompute)
    }
}

impl From<JobPanicked> for EngineError {
    fn from(panic: JobPanicked) -> Self {
        EngineError::Panicked(panic.0)
    }
}
