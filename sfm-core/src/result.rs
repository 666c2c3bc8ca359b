use crate::{CameraIntrinsics, PointCloud, WorldToCamera};

/// Pose and intrinsics of one registered camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub intrinsics: CameraIntrinsics,
    /// World-to-camera rigid transform.
    pub extrinsics: WorldToCamera,
}

/// A mapping from camera name to [`CameraPose`] that preserves insertion
/// order, so "the first camera" is deterministic across runs.
///
/// Lookup is linear; reconstructions register at most a few hundred cameras.
#[derive(Debug, Clone, Default)]
pub struct CameraSet {
    entries: Vec<(String, CameraPose)>,
}

impl CameraSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a camera. Names are unique; inserting an existing name replaces
    /// its pose without changing its position in the ordering.
    pub fn insert(&mut self, name: impl Into<String>, pose: CameraPose) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = pose,
            None => self.entries.push((name, pose)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CameraPose> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, pose)| pose)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The first camera in insertion order, used as the default viewpoint.
    pub fn first_name(&self) -> Option<&str> {
        self.entries.first().map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CameraPose)> {
        self.entries.iter().map(|(name, pose)| (name.as_str(), pose))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything one successful estimation produces: the sparse point cloud, the
/// per-camera poses, and which camera is selected for viewpoint sync.
///
/// Viewers consume this read-only; the active camera is the only mutable bit.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionResult {
    pub point_cloud: PointCloud,
    pub cameras: CameraSet,
    active_camera: Option<String>,
}

impl ReconstructionResult {
    pub fn new(point_cloud: PointCloud, cameras: CameraSet) -> Self {
        Self {
            point_cloud,
            cameras,
            active_camera: None,
        }
    }

    /// Name of the camera currently selected for viewpoint sync.
    ///
    /// Defaults to the first camera in insertion order, so it is `Some`
    /// whenever `cameras` is non-empty.
    pub fn active_camera(&self) -> Option<&str> {
        self.active_camera
            .as_deref()
            .or_else(|| self.cameras.first_name())
    }

    /// Select a camera for viewpoint sync. Returns false (and changes
    /// nothing) when the name is not a key of `cameras`.
    #[must_use]
    pub fn set_active_camera(&mut self, name: &str) -> bool {
        if self.cameras.contains(name) {
            self.active_camera = Some(name.to_owned());
            true
        } else {
            false
        }
    }
}
