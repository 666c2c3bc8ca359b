use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{IsometryMatrix3, Matrix4, Point3, Rotation3, Vector3};

/// A world pose of a camera: maps absolute world positions into coordinates
/// relative to the camera, where the positive x axis is right, positive y is
/// down and positive z is forwards from the optical center.
///
/// The rotation component is orthonormal with determinant +1 by construction
/// ([`Rotation3`] cannot represent anything else).
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
pub struct WorldToCamera(pub IsometryMatrix3<f64>);

impl WorldToCamera {
    /// A pose with no change in position or orientation.
    pub fn identity() -> Self {
        IsometryMatrix3::identity().into()
    }

    /// Create the pose from its rotation and translation parts.
    pub fn from_parts(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        IsometryMatrix3::from_parts(translation.into(), rotation).into()
    }

    /// Retrieve the isometry.
    pub fn isometry(self) -> IsometryMatrix3<f64> {
        self.0
    }

    /// Retrieve the 4×4 homogeneous matrix.
    pub fn homogeneous(self) -> Matrix4<f64> {
        self.0.to_homogeneous()
    }

    /// Takes the inverse of the pose, which tells you where the camera sits
    /// in the world.
    pub fn inverse(self) -> CameraToWorld {
        CameraToWorld(self.0.inverse())
    }

    /// Map a world point into camera coordinates.
    pub fn transform(self, point: Point3<f64>) -> Point3<f64> {
        self.0 * point
    }
}

/// The inverse of [`WorldToCamera`]: maps camera-relative coordinates into
/// absolute world positions, and exposes the camera's placement for viewers.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
pub struct CameraToWorld(pub IsometryMatrix3<f64>);

impl CameraToWorld {
    /// Retrieve the isometry.
    pub fn isometry(self) -> IsometryMatrix3<f64> {
        self.0
    }

    /// Retrieve the 4×4 homogeneous matrix.
    pub fn homogeneous(self) -> Matrix4<f64> {
        self.0.to_homogeneous()
    }

    /// Takes the inverse of the pose.
    pub fn inverse(self) -> WorldToCamera {
        WorldToCamera(self.0.inverse())
    }

    /// Position of the optical center in world coordinates.
    pub fn optical_center(self) -> Point3<f64> {
        Point3::from(self.0.translation.vector)
    }

    /// World-space forward direction (the camera's +z axis).
    pub fn forward(self) -> Vector3<f64> {
        self.0.rotation * Vector3::z()
    }

    /// World-space up direction (the camera's −y axis).
    pub fn up(self) -> Vector3<f64> {
        self.0.rotation * -Vector3::y()
    }

    /// Map a camera-relative point into world coordinates.
    pub fn transform(self, point: Point3<f64>) -> Point3<f64> {
        self.0 * point
    }
}
