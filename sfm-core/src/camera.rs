use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics of a single calibrated camera.
///
/// Focal lengths and the principal point are in pixels. Distortion
/// coefficients estimated by the reconstruction engine are not carried here;
/// consumers that need them must read the engine's own artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Focal length along the x axis.
    pub fx: f64,
    /// Focal length along the y axis.
    pub fy: f64,
    /// Principal point x coordinate.
    pub cx: f64,
    /// Principal point y coordinate.
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(width: u32, height: u32, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        }
    }

    /// Retrieve the 3×3 calibration matrix K.
    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0,     self.cx,
            0.0,     self.fy, self.cy,
            0.0,     0.0,     1.0,
        )
    }

    /// Image dimensions and focal lengths must be strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.fx > 0.0 && self.fy > 0.0
    }
}
