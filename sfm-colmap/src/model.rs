//! Reader for COLMAP sparse reconstructions exported as text.
//!
//! A sparse model is three files:
//! - `cameras.txt` — intrinsics per physical camera
//! - `images.txt` — world-to-camera pose per registered image (two lines per
//!   image; the second carries 2D observations and is skipped here)
//! - `points3D.txt` — triangulated points with color
//!
//! Format reference: <https://colmap.github.io/format.html>

use crate::CameraModel;
use sfm_core::nalgebra::{Point3, Quaternion, Rotation3, UnitQuaternion, Vector3};
use sfm_core::{
    CameraIntrinsics, CameraPose, CameraSet, ColoredPoint, PointCloud, ReconstructionResult,
    WorldToCamera,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors producible while loading a sparse model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("i/o error reading sparse model: {0}")]
    Io(#[from] io::Error),
    #[error("{file}:{line}: {message}")]
    Parse {
        file: &'static str,
        line: usize,
        message: String,
    },
    #[error("image {image:?} references unknown camera {camera_id}")]
    UnknownCameraId { image: String, camera_id: u32 },
    #[error("camera {camera_id} has non-positive dimensions or focal lengths")]
    InvalidIntrinsics { camera_id: u32 },
    #[error("sparse model contains no registered images")]
    NoCameras,
}

/// One `cameras.txt` entry.
#[derive(Debug, Clone)]
pub struct ColmapCamera {
    pub camera_id: u32,
    pub model: CameraModel,
    pub width: u32,
    pub height: u32,
    pub params: Vec<f64>,
}

impl ColmapCamera {
    /// Reduce the model to pinhole intrinsics, dropping distortion terms.
    pub fn intrinsics(&self) -> CameraIntrinsics {
        let (fx, fy, cx, cy) = if self.model.single_focal() {
            (self.params[0], self.params[0], self.params[1], self.params[2])
        } else {
            (self.params[0], self.params[1], self.params[2], self.params[3])
        };
        CameraIntrinsics::new(self.width, self.height, fx, fy, cx, cy)
    }
}

/// One `images.txt` pose entry.
#[derive(Debug, Clone)]
pub struct ColmapImage {
    pub image_id: u32,
    pub camera_id: u32,
    pub name: String,
    /// World-to-camera rotation.
    pub rotation: UnitQuaternion<f64>,
    /// World-to-camera translation.
    pub translation: Vector3<f64>,
}

impl ColmapImage {
    pub fn pose(&self) -> WorldToCamera {
        WorldToCamera::from_parts(Rotation3::from(self.rotation), self.translation)
    }
}

/// Load a sparse model from its directory and assemble the result consumed by
/// viewers. Cameras are keyed by image name in file order, so the default
/// active camera is the first registered image.
///
/// `sparse_dir` may be the model directory itself or its parent; COLMAP's
/// mapper writes numbered submodels, so a `0/` child is preferred when
/// `cameras.txt` is not found directly.
pub fn load_sparse_model(sparse_dir: &Path) -> Result<ReconstructionResult, ModelError> {
    let dir = model_dir(sparse_dir);
    let cameras = read_cameras_txt(&dir.join("cameras.txt"))?;
    let images = read_images_txt(&dir.join("images.txt"))?;
    let points = read_points3d_txt(&dir.join("points3D.txt"))?;

    if images.is_empty() {
        return Err(ModelError::NoCameras);
    }

    let mut set = CameraSet::new();
    for image in &images {
        let camera = cameras
            .get(&image.camera_id)
            .ok_or_else(|| ModelError::UnknownCameraId {
                image: image.name.clone(),
                camera_id: image.camera_id,
            })?;
        let intrinsics = camera.intrinsics();
        if !intrinsics.is_valid() {
            return Err(ModelError::InvalidIntrinsics {
                camera_id: camera.camera_id,
            });
        }
        set.insert(
            image.name.clone(),
            CameraPose {
                intrinsics,
                extrinsics: image.pose(),
            },
        );
    }

    Ok(ReconstructionResult::new(points, set))
}

/// Prefer the `0/` submodel when the given directory is not itself a model.
fn model_dir(sparse_dir: &Path) -> PathBuf {
    if sparse_dir.join("cameras.txt").is_file() {
        return sparse_dir.to_owned();
    }
    let zero = sparse_dir.join("0");
    if zero.join("cameras.txt").is_file() {
        zero
    } else {
        sparse_dir.to_owned()
    }
}

/// Read `cameras.txt`: `CAMERA_ID MODEL WIDTH HEIGHT PARAMS[]`.
pub fn read_cameras_txt(path: &Path) -> Result<HashMap<u32, ColmapCamera>, ModelError> {
    const FILE: &str = "cameras.txt";
    let mut cameras = HashMap::new();
    for (line_no, line) in data_lines(path)? {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            return Err(parse_error(FILE, line_no, "expected at least 4 fields"));
        }
        let camera_id = parse_field(FILE, line_no, tokens[0], "camera id")?;
        let model = CameraModel::from_str(tokens[1])
            .map_err(|_| parse_error(FILE, line_no, format!("unknown camera model {:?}", tokens[1])))?;
        let width = parse_field(FILE, line_no, tokens[2], "width")?;
        let height = parse_field(FILE, line_no, tokens[3], "height")?;
        let params = tokens[4..]
            .iter()
            .map(|token| parse_field(FILE, line_no, token, "camera parameter"))
            .collect::<Result<Vec<f64>, _>>()?;
        if params.len() != model.param_count() {
            return Err(parse_error(
                FILE,
                line_no,
                format!(
                    "{} expects {} parameters, got {}",
                    model,
                    model.param_count(),
                    params.len()
                ),
            ));
        }
        cameras.insert(
            camera_id,
            ColmapCamera {
                camera_id,
                model,
                width,
                height,
                params,
            },
        );
    }
    Ok(cameras)
}

/// Read `images.txt`: pose lines
/// `IMAGE_ID QW QX QY QZ TX TY TZ CAMERA_ID NAME`, each followed by a line of
/// 2D observations that is skipped. The observation line is empty when an
/// image has no 2D points, so the pose/observation alternation runs over raw
/// lines and only comments are skipped.
pub fn read_images_txt(path: &Path) -> Result<Vec<ColmapImage>, ModelError> {
    const FILE: &str = "images.txt";
    let reader = BufReader::new(File::open(path)?);
    let mut images = Vec::new();
    let mut expect_pose = true;
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(ModelError::Io)?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        if !expect_pose {
            // Observation line of the previous image, possibly empty.
            expect_pose = true;
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 10 {
            return Err(parse_error(FILE, line_no, "expected at least 10 fields"));
        }
        let image_id = parse_field(FILE, line_no, tokens[0], "image id")?;
        let quat: Vec<f64> = tokens[1..5]
            .iter()
            .map(|token| parse_field(FILE, line_no, token, "quaternion component"))
            .collect::<Result<_, _>>()?;
        let trans: Vec<f64> = tokens[5..8]
            .iter()
            .map(|token| parse_field(FILE, line_no, token, "translation component"))
            .collect::<Result<_, _>>()?;
        let camera_id = parse_field(FILE, line_no, tokens[8], "camera id")?;
        // Image names may contain spaces; everything after the camera id is
        // the name.
        let name = tokens[9..].join(" ");
        // Normalization makes the rotation orthonormal even if the file
        // carries rounding noise.
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
            quat[0], quat[1], quat[2], quat[3],
        ));
        images.push(ColmapImage {
            image_id,
            camera_id,
            name,
            rotation,
            translation: Vector3::new(trans[0], trans[1], trans[2]),
        });
        expect_pose = false;
    }
    Ok(images)
}

/// Read `points3D.txt`: `POINT3D_ID X Y Z R G B ERROR TRACK[]`; the track is
/// ignored.
pub fn read_points3d_txt(path: &Path) -> Result<PointCloud, ModelError> {
    const FILE: &str = "points3D.txt";
    let mut cloud = PointCloud::new();
    for (line_no, line) in data_lines(path)? {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 7 {
            return Err(parse_error(FILE, line_no, "expected at least 7 fields"));
        }
        let x: f64 = parse_field(FILE, line_no, tokens[1], "x")?;
        let y: f64 = parse_field(FILE, line_no, tokens[2], "y")?;
        let z: f64 = parse_field(FILE, line_no, tokens[3], "z")?;
        let r: u8 = parse_field(FILE, line_no, tokens[4], "red")?;
        let g: u8 = parse_field(FILE, line_no, tokens[5], "green")?;
        let b: u8 = parse_field(FILE, line_no, tokens[6], "blue")?;
        cloud.push(ColoredPoint {
            position: Point3::new(x, y, z),
            color: [r, g, b],
        });
    }
    Ok(cloud)
}

/// Iterate over the non-empty, non-comment lines of a model file, numbered
/// from 1.
fn data_lines(path: &Path) -> Result<impl Iterator<Item = (usize, String)>, ModelError> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader
        .lines()
        .collect::<io::Result<Vec<String>>>()?
        .into_iter()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        });
    Ok(lines)
}

fn parse_error(file: &'static str, line: usize, message: impl Into<String>) -> ModelError {
    ModelError::Parse {
        file,
        line,
        message: message.into(),
    }
}

fn parse_field<T: FromStr>(
    file: &'static str,
    line: usize,
    token: &str,
    what: &str,
) -> Result<T, ModelError> {
    token
        .parse()
        .map_err(|_| parse_error(file, line, format!("invalid {what} {token:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CAMERAS: &str = "\
# Camera list with one line of data per camera:
#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]
1 SIMPLE_RADIAL 3072 2304 2559.81 1536 1152 -0.0218
2 PINHOLE 1920 1080 1400.0 1410.0 960.0 540.0
";

    const IMAGES: &str = "\
# Image list with two lines of data per image:
#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
1 1 0 0 0 0.5 -0.25 2.0 1 cam0.jpg
10.0 20.0 -1
2 0.7071067811865476 0 0.7071067811865475 0 0 0 1 2 cam1.jpg
";

    const POINTS: &str = "\
# 3D point list with one line of data per point:
1 1.0 2.0 3.0 255 0 0 0.5 1 0
2 -1.0 0.5 4.0 0 128 255 1.2 2 1
";

    fn write_model(dir: &Path) {
        fs::write(dir.join("cameras.txt"), CAMERAS).unwrap();
        fs::write(dir.join("images.txt"), IMAGES).unwrap();
        fs::write(dir.join("points3D.txt"), POINTS).unwrap();
    }

    #[test]
    fn loads_a_model_in_file_order() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        let result = load_sparse_model(dir.path()).unwrap();

        assert_eq!(result.point_cloud.len(), 2);
        assert_eq!(result.cameras.len(), 2);
        let names: Vec<_> = result.cameras.names().collect();
        assert_eq!(names, ["cam0.jpg", "cam1.jpg"]);
        assert_eq!(result.active_camera(), Some("cam0.jpg"));
    }

    #[test]
    fn single_focal_models_duplicate_the_focal_length() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        let result = load_sparse_model(dir.path()).unwrap();
        let camera = result.cameras.get("cam0.jpg").unwrap();
        assert_eq!(camera.intrinsics.fx, 2559.81);
        assert_eq!(camera.intrinsics.fy, 2559.81);
        assert_eq!(camera.intrinsics.cx, 1536.0);
        assert_eq!(camera.intrinsics.cy, 1152.0);
        assert_eq!(camera.intrinsics.width, 3072);

        let pinhole = result.cameras.get("cam1.jpg").unwrap();
        assert_eq!(pinhole.intrinsics.fx, 1400.0);
        assert_eq!(pinhole.intrinsics.fy, 1410.0);
    }

    #[test]
    fn identity_quaternion_gives_identity_rotation() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        let result = load_sparse_model(dir.path()).unwrap();
        let camera = result.cameras.get("cam0.jpg").unwrap();
        let m = camera.extrinsics.homogeneous();
        assert!((m[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((m[(1, 1)] - 1.0).abs() < 1e-12);
        assert!((m[(0, 3)] - 0.5).abs() < 1e-12);
        assert!((m[(1, 3)] + 0.25).abs() < 1e-12);
        assert!((m[(2, 3)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn image_without_observations_has_an_empty_second_line() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        fs::write(
            dir.path().join("images.txt"),
            "1 1 0 0 0 0 0 0 1 cam0.jpg\n\n2 1 0 0 0 1 0 0 2 cam1.jpg\n1.0 2.0 -1\n",
        )
        .unwrap();
        let result = load_sparse_model(dir.path()).unwrap();
        let names: Vec<_> = result.cameras.names().collect();
        assert_eq!(names, ["cam0.jpg", "cam1.jpg"]);
    }

    #[test]
    fn point_colors_are_preserved() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        let result = load_sparse_model(dir.path()).unwrap();
        let colors: Vec<_> = result.point_cloud.iter().map(|p| p.color).collect();
        assert!(colors.contains(&[255, 0, 0]));
        assert!(colors.contains(&[0, 128, 255]));
    }

    #[test]
    fn numbered_submodel_is_discovered() {
        let dir = TempDir::new().unwrap();
        let zero = dir.path().join("0");
        fs::create_dir(&zero).unwrap();
        write_model(&zero);
        let result = load_sparse_model(dir.path()).unwrap();
        assert_eq!(result.cameras.len(), 2);
    }

    #[test]
    fn wrong_parameter_count_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        fs::write(dir.path().join("cameras.txt"), "1 PINHOLE 640 480 500.0 500.0 320.0\n")
            .unwrap();
        let err = load_sparse_model(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::Parse { file: "cameras.txt", .. }));
    }

    #[test]
    fn unknown_model_name_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        fs::write(dir.path().join("cameras.txt"), "1 TELESCOPE 640 480 1.0\n").unwrap();
        let err = load_sparse_model(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::Parse { .. }));
    }

    #[test]
    fn dangling_camera_reference_is_reported() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        fs::write(
            dir.path().join("images.txt"),
            "1 1 0 0 0 0 0 0 42 cam0.jpg\n\n",
        )
        .unwrap();
        let err = load_sparse_model(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownCameraId { camera_id: 42, .. }));
    }

    #[test]
    fn model_without_images_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        fs::write(dir.path().join("images.txt"), "# empty\n").unwrap();
        let err = load_sparse_model(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::NoCameras));
    }

    #[test]
    fn zero_focal_length_is_invalid_intrinsics() {
        let dir = TempDir::new().unwrap();
        write_model(dir.path());
        fs::write(
            dir.path().join("cameras.txt"),
            "1 SIMPLE_RADIAL 3072 2304 0.0 1536 1152 -0.0218\n2 PINHOLE 1920 1080 1400.0 1410.0 960.0 540.0\n",
        )
        .unwrap();
        let err = load_sparse_model(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidIntrinsics { camera_id: 1 }));
    }
}
