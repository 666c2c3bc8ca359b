use crate::{CameraIntrinsics, WorldToCamera};
use nalgebra::Point3;

/// Wireframe pyramid for drawing a camera in a 3D viewer.
///
/// Vertex 0 is the optical center; vertices 1..=4 are the image corners
/// unprojected to the chosen depth, in (0,0), (w,0), (w,h), (0,h) order.
/// The eight edges connect the apex to each corner and the corners into a rim.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrustum {
    pub vertices: [Point3<f64>; 5],
    pub edges: [[usize; 2]; 8],
}

/// Build the wireframe frustum of a camera, with the image plane placed
/// `scale` world units in front of the optical center.
pub fn camera_frustum(
    intrinsics: &CameraIntrinsics,
    extrinsics: WorldToCamera,
    scale: f64,
) -> CameraFrustum {
    let camera_to_world = extrinsics.inverse();
    let corner = |u: f64, v: f64| {
        // Unproject the pixel to depth `scale` in camera space.
        let x = (u - intrinsics.cx) / intrinsics.fx * scale;
        let y = (v - intrinsics.cy) / intrinsics.fy * scale;
        camera_to_world.transform(Point3::new(x, y, scale))
    };
    let w = f64::from(intrinsics.width);
    let h = f64::from(intrinsics.height);
    CameraFrustum {
        vertices: [
            camera_to_world.optical_center(),
            corner(0.0, 0.0),
            corner(w, 0.0),
            corner(w, h),
            corner(0.0, h),
        ],
        edges: [
            [0, 1],
            [0, 2],
            [0, 3],
            [0, 4],
            [1, 2],
            [2, 3],
            [3, 4],
            [4, 1],
        ],
    }
}
