//! Driver for the `colmap` command line tool.

use crate::{ColmapOptions, DatasetWorkspace, ModelError};
use log::*;
use sfm_core::ReconstructionResult;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Errors producible while running the reconstruction pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch colmap: {0}")]
    Io(#[from] io::Error),
    #[error("`{command}` exited with {status}")]
    Tool { command: String, status: ExitStatus },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("estimation worker panicked: {0}")]
    Panicked(String),
}

/// Runs the COLMAP sparse reconstruction pipeline on a dataset workspace and
/// loads the resulting model.
///
/// The pipeline is feature extraction, matching with the configured matcher,
/// incremental mapping, and conversion of the binary model to text. When the
/// workspace already holds reconstruction artifacts and recomputation is not
/// requested, the pipeline is skipped and the cached model is loaded as-is.
#[derive(Debug, Clone)]
pub struct ColmapEngine {
    executable: PathBuf,
    options: ColmapOptions,
}

impl ColmapEngine {
    pub fn new(options: ColmapOptions) -> Self {
        Self {
            executable: PathBuf::from("colmap"),
            options,
        }
    }

    /// Use a specific `colmap` binary rather than whatever is on `PATH`.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn options(&self) -> &ColmapOptions {
        &self.options
    }

    /// Reconstruct the dataset, reusing cached artifacts unless `recompute`
    /// is set.
    pub fn estimate(
        &self,
        workspace: &DatasetWorkspace,
        recompute: bool,
    ) -> Result<ReconstructionResult, EngineError> {
        if !recompute && workspace.has_cached_artifacts() {
            info!(
                "reusing cached reconstruction in {}",
                workspace.root().display()
            );
        } else {
            self.run_pipeline(workspace)?;
        }
        Ok(crate::load_sparse_model(&workspace.sparse_dir())?)
    }

    fn run_pipeline(&self, workspace: &DatasetWorkspace) -> Result<(), EngineError> {
        let database = workspace.database_path();
        let images = workspace.image_dir();
        let sparse = workspace.sparse_dir();
        if let Some(parent) = database.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&sparse)?;

        info!(
            "running colmap pipeline on {} ({})",
            workspace.root().display(),
            self.options.camera_model
        );

        self.run("feature_extractor", |cmd| {
            cmd.arg("--database_path")
                .arg(&database)
                .arg("--image_path")
                .arg(&images)
                .arg("--ImageReader.camera_model")
                .arg(self.options.camera_model.as_str())
                .arg("--SiftExtraction.gpu_index")
                .arg(self.options.gpu_index.to_string());
        })?;

        self.run(self.options.matcher.as_str(), |cmd| {
            cmd.arg("--database_path").arg(&database);
        })?;

        self.run("mapper", |cmd| {
            cmd.arg("--database_path")
                .arg(&database)
                .arg("--image_path")
                .arg(&images)
                .arg("--output_path")
                .arg(&sparse);
        })?;

        // The mapper writes numbered submodels; convert the first one.
        let model = if sparse.join("0").is_dir() {
            sparse.join("0")
        } else {
            sparse.clone()
        };
        self.run("model_converter", |cmd| {
            cmd.arg("--input_path")
                .arg(&model)
                .arg("--output_path")
                .arg(&model)
                .arg("--output_type")
                .arg("TXT");
        })?;

        Ok(())
    }

    fn run(
        &self,
        subcommand: &str,
        configure: impl FnOnce(&mut Command),
    ) -> Result<(), EngineError> {
        let mut command = Command::new(&self.executable);
        command.arg(subcommand);
        configure(&mut command);
        debug!("running {:?}", command);
        let status = command.status()?;
        if !status.success() {
            return Err(EngineError::Tool {
                command: format!("{} {}", self.executable.display(), subcommand),
                status,
            });
        }
        Ok(())
    }
}
