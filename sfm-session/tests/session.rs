//! Session lifecycle tests against mock engines.

use sfm_colmap::{DatasetWorkspace, EngineError, ModelError};
use sfm_core::nalgebra::{Rotation3, Vector3};
use sfm_core::{
    CameraIntrinsics, CameraPose, CameraSet, PointCloud, ReconstructionResult, WorldToCamera,
};
use sfm_session::{ReconstructionEngine, ReconstructionSession, SessionError};
use std::collections::VecDeque;
use std::fs;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn fake_result(names: &[&str]) -> ReconstructionResult {
    let mut cameras = CameraSet::new();
    for (i, name) in names.iter().enumerate() {
        cameras.insert(
            *name,
            CameraPose {
                intrinsics: CameraIntrinsics::new(640, 480, 500.0, 500.0, 320.0, 240.0),
                extrinsics: WorldToCamera::from_parts(
                    Rotation3::identity(),
                    Vector3::new(i as f64, 0.0, 0.0),
                ),
            },
        );
    }
    ReconstructionResult::new(PointCloud::new(), cameras)
}

fn fake_error() -> EngineError {
    EngineError::Model(ModelError::NoCameras)
}

/// Dataset root with a couple of images and no cached artifacts.
fn dataset(names: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    for name in names {
        fs::write(images.join(name), b"").unwrap();
    }
    dir
}

/// Always returns the same camera names.
struct FixedEngine(Vec<String>);

impl ReconstructionEngine for FixedEngine {
    fn estimate(
        &self,
        _workspace: &DatasetWorkspace,
        _recompute: bool,
    ) -> Result<ReconstructionResult, EngineError> {
        let names: Vec<&str> = self.0.iter().map(String::as_str).collect();
        Ok(fake_result(&names))
    }
}

/// Plays back a queue of outcomes, one per estimation.
struct ScriptedEngine(Mutex<VecDeque<Result<ReconstructionResult, EngineError>>>);

impl ScriptedEngine {
    fn new(outcomes: Vec<Result<ReconstructionResult, EngineError>>) -> Self {
        Self(Mutex::new(outcomes.into()))
    }
}

impl ReconstructionEngine for ScriptedEngine {
    fn estimate(
        &self,
        _workspace: &DatasetWorkspace,
        _recompute: bool,
    ) -> Result<ReconstructionResult, EngineError> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(fake_error()))
    }
}

/// Blocks until released through a channel.
struct BlockingEngine(Mutex<Receiver<()>>);

impl BlockingEngine {
    fn new() -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Self(Mutex::new(rx)), tx)
    }
}

impl ReconstructionEngine for BlockingEngine {
    fn estimate(
        &self,
        _workspace: &DatasetWorkspace,
        _recompute: bool,
    ) -> Result<ReconstructionResult, EngineError> {
        self.0.lock().unwrap().recv().ok();
        Ok(fake_result(&["cam0.jpg"]))
    }
}

struct PanickyEngine;

impl ReconstructionEngine for PanickyEngine {
    fn estimate(
        &self,
        _workspace: &DatasetWorkspace,
        _recompute: bool,
    ) -> Result<ReconstructionResult, EngineError> {
        panic!("engine crashed mid-reconstruction")
    }
}

fn wait_until_complete<E: ReconstructionEngine>(
    session: &mut ReconstructionSession<E>,
) -> Result<(), SessionError> {
    for _ in 0..500 {
        if session.is_estimation_complete()? {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("estimation did not complete in time");
}

#[test]
fn result_is_not_ready_before_estimation() {
    let session = ReconstructionSession::new(FixedEngine(vec!["a.jpg".into()]));
    assert!(matches!(session.result(), Err(SessionError::NotReady)));
    assert!(matches!(
        session.active_camera(),
        Err(SessionError::NotReady)
    ));
    assert!(matches!(
        session.camera_pose("a.jpg"),
        Err(SessionError::NotReady)
    ));
}

#[test]
fn estimation_requires_a_dataset_path() {
    let mut session = ReconstructionSession::new(FixedEngine(vec!["a.jpg".into()]));
    assert!(matches!(
        session.start_estimation(false),
        Err(SessionError::DatasetPathUnset)
    ));
    assert!(matches!(
        session.validate_existing_artifacts(),
        Err(SessionError::DatasetPathUnset)
    ));
    assert!(matches!(
        session.list_image_files(),
        Err(SessionError::DatasetPathUnset)
    ));
}

#[test]
fn empty_image_folder_clears_the_dataset_path() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("images")).unwrap();
    let mut session = ReconstructionSession::new(FixedEngine(vec!["a.jpg".into()]));
    let err = session.set_dataset_path(dir.path()).unwrap_err();
    assert!(matches!(err, SessionError::EmptyDataset(root) if root == dir.path()));
    assert!(session.dataset_path().is_none());
}

#[test]
fn unreadable_image_folder_is_an_io_error_not_an_empty_dataset() {
    let dir = TempDir::new().unwrap();
    // `images` exists but is a file, so listing it fails with something other
    // than not-found.
    fs::write(dir.path().join("images"), b"").unwrap();
    let mut session = ReconstructionSession::new(FixedEngine(vec!["a.jpg".into()]));
    assert!(matches!(
        session.set_dataset_path(dir.path()),
        Err(SessionError::Io(_))
    ));
}

#[test]
fn folder_without_images_subdir_is_also_empty() {
    let dir = TempDir::new().unwrap();
    let mut session = ReconstructionSession::new(FixedEngine(vec!["a.jpg".into()]));
    assert!(matches!(
        session.set_dataset_path(dir.path()),
        Err(SessionError::EmptyDataset(_))
    ));
}

#[test]
fn full_lifecycle_produces_a_result() {
    let dir = dataset(&["b.png", "a.jpg"]);
    let mut session =
        ReconstructionSession::new(FixedEngine(vec!["cam0.jpg".into(), "cam1.jpg".into()]));
    session.set_dataset_path(dir.path()).unwrap();
    assert_eq!(session.dataset_path(), Some(dir.path()));

    let images = session.list_image_files().unwrap();
    let names: Vec<_> = images
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(names, ["a.jpg", "b.png"]);
    assert!(!session.validate_existing_artifacts().unwrap());

    session.start_estimation(false).unwrap();
    wait_until_complete(&mut session).unwrap();

    let result = session.result().unwrap();
    assert_eq!(result.cameras.len(), 2);
    assert_eq!(session.active_camera().unwrap(), Some("cam0.jpg"));
    assert_eq!(session.camera_names().unwrap(), ["cam0.jpg", "cam1.jpg"]);

    let (intrinsics, pose) = session.camera_pose("cam1.jpg").unwrap();
    assert_eq!(intrinsics.width, 640);
    assert_eq!(pose[(0, 3)], 1.0);
}

#[test]
fn unknown_camera_is_rejected() {
    let dir = dataset(&["a.jpg"]);
    let mut session = ReconstructionSession::new(FixedEngine(vec!["cam0.jpg".into()]));
    session.set_dataset_path(dir.path()).unwrap();
    session.start_estimation(false).unwrap();
    wait_until_complete(&mut session).unwrap();

    assert!(matches!(
        session.camera_pose("missing.jpg"),
        Err(SessionError::UnknownCamera(name)) if name == "missing.jpg"
    ));
    assert!(matches!(
        session.set_active_camera("missing.jpg"),
        Err(SessionError::UnknownCamera(_))
    ));
    session.set_active_camera("cam0.jpg").unwrap();
    assert_eq!(session.active_camera().unwrap(), Some("cam0.jpg"));
}

#[test]
fn failed_estimation_keeps_the_previous_result() {
    let dir = dataset(&["a.jpg"]);
    let mut session = ReconstructionSession::new(ScriptedEngine::new(vec![
        Ok(fake_result(&["cam0.jpg"])),
        Err(fake_error()),
    ]));
    session.set_dataset_path(dir.path()).unwrap();

    session.start_estimation(false).unwrap();
    wait_until_complete(&mut session).unwrap();
    assert_eq!(session.camera_names().unwrap(), ["cam0.jpg"]);

    session.start_estimation(true).unwrap();
    let err = wait_until_complete(&mut session).unwrap_err();
    assert!(matches!(err, SessionError::Estimation(_)));

    // The first run's result survives the second run's failure.
    assert_eq!(session.camera_names().unwrap(), ["cam0.jpg"]);
    // And after the failure was reported, no job is in flight.
    assert!(session.is_estimation_complete().unwrap());
}

#[test]
fn second_estimation_is_rejected_while_one_runs() {
    let dir = dataset(&["a.jpg"]);
    let (engine, release) = BlockingEngine::new();
    let mut session = ReconstructionSession::new(engine);
    session.set_dataset_path(dir.path()).unwrap();

    session.start_estimation(false).unwrap();
    assert!(!session.is_estimation_complete().unwrap());
    assert!(matches!(
        session.start_estimation(false),
        Err(SessionError::EstimationInFlight)
    ));
    assert!(matches!(
        session.set_dataset_path(dir.path()),
        Err(SessionError::EstimationInFlight)
    ));

    release.send(()).unwrap();
    wait_until_complete(&mut session).unwrap();
    assert_eq!(session.camera_names().unwrap(), ["cam0.jpg"]);
}

#[test]
fn engine_panic_surfaces_as_an_estimation_error() {
    let dir = dataset(&["a.jpg"]);
    let mut session = ReconstructionSession::new(PanickyEngine);
    session.set_dataset_path(dir.path()).unwrap();
    session.start_estimation(false).unwrap();
    let err = wait_until_complete(&mut session).unwrap_err();
    match err {
        SessionError::Estimation(EngineError::Panicked(message)) => {
            assert!(message.contains("crashed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn artifacts_are_validated_on_disk() {
    let dir = dataset(&["a.jpg"]);
    let mut session = ReconstructionSession::new(FixedEngine(vec!["cam0.jpg".into()]));
    session.set_dataset_path(dir.path()).unwrap();
    assert!(!session.validate_existing_artifacts().unwrap());

    let colmap = dir.path().join("colmap");
    fs::create_dir_all(colmap.join("sparse")).unwrap();
    fs::write(colmap.join("database.db"), b"").unwrap();
    assert!(session.validate_existing_artifacts().unwrap());
}

#[test]
fn switching_datasets_discards_the_old_result() {
    let first = dataset(&["a.jpg"]);
    let second = dataset(&["b.jpg"]);
    let mut session = ReconstructionSession::new(FixedEngine(vec!["cam0.jpg".into()]));
    session.set_dataset_path(first.path()).unwrap();
    session.start_estimation(false).unwrap();
    wait_until_complete(&mut session).unwrap();
    assert!(session.result().is_ok());

    session.set_dataset_path(second.path()).unwrap();
    assert!(matches!(session.result(), Err(SessionError::NotReady)));
}

#[test]
fn image_listing_is_case_insensitive_on_extension() {
    let dir = dataset(&["UPPER.JPG", "weird.TiFf", "skip.txt"]);
    let mut session = ReconstructionSession::new(FixedEngine(vec![]));
    session.set_dataset_path(dir.path()).unwrap();
    let names: Vec<_> = session
        .list_image_files()
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["UPPER.JPG", "weird.TiFf"]);
}
