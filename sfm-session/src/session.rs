//! Reconstruction sessions.
//!
//! A session owns a dataset path, at most one in-flight estimation job, and
//! the most recent successful reconstruction. All methods are non-blocking;
//! estimation runs on a worker thread and the session absorbs its outcome on
//! the next call that looks at job state.

use crate::worker::{submit, JobHandle, JobPoll};
use crate::ReconstructionEngine;
use log::*;
use sfm_colmap::{list_image_files, DatasetWorkspace, EngineError};
use sfm_core::nalgebra::Matrix4;
use sfm_core::{CameraIntrinsics, ReconstructionResult};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no dataset path has been set")]
    DatasetPathUnset,
    #[error("no reconstruction result is available yet")]
    NotReady,
    #[error("no camera named {0:?} in the reconstruction")]
    UnknownCamera(String),
    #[error("no image files found under {}", .0.display())]
    EmptyDataset(PathBuf),
    #[error("an estimation job is already running")]
    EstimationInFlight,
    #[error("estimation failed: {0}")]
    Estimation(#[from] EngineError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// A reconstruction session bound to one engine.
pub struct ReconstructionSession<E> {
    engine: Arc<E>,
    workspace: Option<DatasetWorkspace>,
    result: Option<ReconstructionResult>,
    job: Option<JobHandle<ReconstructionResult, EngineError>>,
}

impl<E: ReconstructionEngine> ReconstructionSession<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            workspace: None,
            result: None,
            job: None,
        }
    }

    /// Point the session at a dataset root. The root must contain an
    /// `images/` folder with at least one image file; an empty folder clears
    /// the dataset path and any stale result so the session cannot operate on
    /// data that no longer matches its path.
    ///
    /// Rejected while an estimation is in flight.
    pub fn set_dataset_path(&mut self, root: impl Into<PathBuf>) -> Result<(), SessionError> {
        self.absorb_finished_job();
        if self.job.is_some() {
            return Err(SessionError::EstimationInFlight);
        }
        let workspace = DatasetWorkspace::new(root);
        // A missing images folder is an empty dataset; any other failure to
        // read it is a real i/o error.
        let images = match list_image_files(&workspace.image_dir()) {
            Ok(images) => images,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(SessionError::Io(e)),
        };
        if images.is_empty() {
            let root = workspace.root().to_owned();
            self.workspace = None;
            self.result = None;
            return Err(SessionError::EmptyDataset(root));
        }
        info!(
            "dataset {} with {} images",
            workspace.root().display(),
            images.len()
        );
        self.workspace = Some(workspace);
        self.result = None;
        Ok(())
    }

    pub fn dataset_path(&self) -> Option<&Path> {
        self.workspace.as_ref().map(|w| w.root())
    }

    pub fn workspace(&self) -> Option<&DatasetWorkspace> {
        self.workspace.as_ref()
    }

    /// True when the dataset already holds all artifacts of a prior
    /// reconstruction, so estimation can reuse them.
    pub fn validate_existing_artifacts(&self) -> Result<bool, SessionError> {
        let workspace = self.workspace.as_ref().ok_or(SessionError::DatasetPathUnset)?;
        Ok(workspace.has_cached_artifacts())
    }

    /// Image files in the dataset's image folder, sorted by path.
    pub fn list_image_files(&self) -> Result<Vec<PathBuf>, SessionError> {
        let workspace = self.workspace.as_ref().ok_or(SessionError::DatasetPathUnset)?;
        Ok(list_image_files(&workspace.image_dir())?)
    }

    /// Kick off estimation on a worker thread. At most one job runs at a
    /// time; a finished job's outcome is absorbed first, so starting a new
    /// run after a completed one discards nothing.
    pub fn start_estimation(&mut self, recompute: bool) -> Result<(), SessionError> {
        self.absorb_finished_job();
        if self.job.is_some() {
            return Err(SessionError::EstimationInFlight);
        }
        let workspace = self
            .workspace
            .clone()
            .ok_or(SessionError::DatasetPathUnset)?;
        let engine = Arc::clone(&self.engine);
        info!("starting estimation of {}", workspace.root().display());
        self.job = Some(submit(move || engine.estimate(&workspace, recompute)));
        Ok(())
    }

    /// Non-blocking check on the estimation job.
    ///
    /// Returns `Ok(true)` when no job is running (including right after a
    /// successful job, whose result becomes visible through [`Self::result`]),
    /// `Ok(false)` while one is, and the job's error if it failed. A failure
    /// leaves any previous result untouched.
    pub fn is_estimation_complete(&mut self) -> Result<bool, SessionError> {
        let job = match &self.job {
            None => return Ok(true),
            Some(job) => job,
        };
        match job.poll() {
            JobPoll::Pending => Ok(false),
            JobPoll::Completed(result) => {
                info!("estimation finished with {} cameras", result.cameras.len());
                self.result = Some(result);
                self.job = None;
                Ok(true)
            }
            JobPoll::Failed(error) => {
                self.job = None;
                Err(SessionError::Estimation(error))
            }
        }
    }

    /// The latest successful reconstruction.
    pub fn result(&self) -> Result<&ReconstructionResult, SessionError> {
        self.result.as_ref().ok_or(SessionError::NotReady)
    }

    pub fn result_mut(&mut self) -> Result<&mut ReconstructionResult, SessionError> {
        self.result.as_mut().ok_or(SessionError::NotReady)
    }

    /// Intrinsics and homogeneous world-to-camera matrix for a named camera.
    pub fn camera_pose(&self, name: &str) -> Result<(CameraIntrinsics, Matrix4<f64>), SessionError> {
        let result = self.result()?;
        let pose = result
            .cameras
            .get(name)
            .ok_or_else(|| SessionError::UnknownCamera(name.to_owned()))?;
        Ok((pose.intrinsics, pose.extrinsics.homogeneous()))
    }

    /// The active camera name, defaulting to the first registered camera.
    pub fn active_camera(&self) -> Result<Option<&str>, SessionError> {
        Ok(self.result()?.active_camera())
    }

    pub fn set_active_camera(&mut self, name: &str) -> Result<(), SessionError> {
        let result = self.result_mut()?;
        if result.set_active_camera(name) {
            Ok(())
        } else {
            Err(SessionError::UnknownCamera(name.to_owned()))
        }
    }

    /// Registered camera names in reconstruction order.
    pub fn camera_names(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.result()?.cameras.names().map(str::to_owned).collect())
    }

    /// Install a finished job's outcome without reporting it. A success
    /// becomes the session result; a failure is logged and dropped, since the
    /// caller showed no interest in it before starting something new.
    fn absorb_finished_job(&mut self) {
        let job = match &self.job {
            Some(job) if job.is_finished() => job,
            _ => return,
        };
        match job.poll() {
            JobPoll::Pending => {}
            JobPoll::Completed(result) => {
                self.result = Some(result);
                self.job = None;
            }
            JobPoll::Failed(error) => {
                warn!("discarding failed estimation: {}", error);
                self.job = None;
            }
        }
    }
}
