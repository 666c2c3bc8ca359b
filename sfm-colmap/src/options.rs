use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while validating engine options. These surface at
/// construction time, before any session or job exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported camera model {0:?}")]
    UnknownCameraModel(String),
    #[error("only exhaustive_matcher, vocab_tree_matcher and sequential_matcher are supported, got {0:?}")]
    UnknownMatcher(String),
}

/// Camera models understood by COLMAP's feature extractor.
///
/// Serialized with COLMAP's own tokens so settings files and `cameras.txt`
/// use the same spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraModel {
    #[serde(rename = "OPENCV")]
    OpenCv,
    #[serde(rename = "SIMPLE_PINHOLE")]
    SimplePinhole,
    #[serde(rename = "PINHOLE")]
    Pinhole,
    #[serde(rename = "SIMPLE_RADIAL")]
    SimpleRadial,
    #[serde(rename = "RADIAL")]
    Radial,
    #[serde(rename = "FULL_OPENCV")]
    FullOpenCv,
    #[serde(rename = "SIMPLE_RADIAL_FISHEYE")]
    SimpleRadialFisheye,
    #[serde(rename = "RADIAL_FISHEYE")]
    RadialFisheye,
    #[serde(rename = "OPENCV_FISHEYE")]
    OpenCvFisheye,
    #[serde(rename = "FOV")]
    Fov,
    #[serde(rename = "THIN_PRISM_FISHEYE")]
    ThinPrismFisheye,
}

impl CameraModel {
    pub const ALL: [CameraModel; 11] = [
        CameraModel::OpenCv,
        CameraModel::SimplePinhole,
        CameraModel::Pinhole,
        CameraModel::SimpleRadial,
        CameraModel::Radial,
        CameraModel::FullOpenCv,
        CameraModel::SimpleRadialFisheye,
        CameraModel::RadialFisheye,
        CameraModel::OpenCvFisheye,
        CameraModel::Fov,
        CameraModel::ThinPrismFisheye,
    ];

    /// COLMAP's token for this model.
    pub fn as_str(self) -> &'static str {
        match self {
            CameraModel::OpenCv => "OPENCV",
            CameraModel::SimplePinhole => "SIMPLE_PINHOLE",
            CameraModel::Pinhole => "PINHOLE",
            CameraModel::SimpleRadial => "SIMPLE_RADIAL",
            CameraModel::Radial => "RADIAL",
            CameraModel::FullOpenCv => "FULL_OPENCV",
            CameraModel::SimpleRadialFisheye => "SIMPLE_RADIAL_FISHEYE",
            CameraModel::RadialFisheye => "RADIAL_FISHEYE",
            CameraModel::OpenCvFisheye => "OPENCV_FISHEYE",
            CameraModel::Fov => "FOV",
            CameraModel::ThinPrismFisheye => "THIN_PRISM_FISHEYE",
        }
    }

    /// Number of values in the model's parameter list within `cameras.txt`.
    pub fn param_count(self) -> usize {
        match self {
            CameraModel::SimplePinhole => 3,
            CameraModel::Pinhole => 4,
            CameraModel::SimpleRadial => 4,
            CameraModel::Radial => 5,
            CameraModel::OpenCv => 8,
            CameraModel::FullOpenCv => 12,
            CameraModel::SimpleRadialFisheye => 4,
            CameraModel::RadialFisheye => 5,
            CameraModel::OpenCvFisheye => 8,
            CameraModel::Fov => 5,
            CameraModel::ThinPrismFisheye => 12,
        }
    }

    /// Whether the parameter list starts with a single shared focal length
    /// instead of separate fx and fy.
    pub(crate) fn single_focal(self) -> bool {
        matches!(
            self,
            CameraModel::SimplePinhole
                | CameraModel::SimpleRadial
                | CameraModel::Radial
                | CameraModel::SimpleRadialFisheye
                | CameraModel::RadialFisheye
        )
    }
}

impl Default for CameraModel {
    fn default() -> Self {
        CameraModel::OpenCv
    }
}

impl fmt::Display for CameraModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownCameraModel(s.to_owned()))
    }
}

/// Feature matching strategies COLMAP can run. The token doubles as the
/// COLMAP subcommand name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Matcher {
    #[serde(rename = "exhaustive_matcher")]
    Exhaustive,
    #[serde(rename = "vocab_tree_matcher")]
    VocabTree,
    #[serde(rename = "sequential_matcher")]
    Sequential,
}

impl Matcher {
    pub const ALL: [Matcher; 3] = [Matcher::Exhaustive, Matcher::VocabTree, Matcher::Sequential];

    pub fn as_str(self) -> &'static str {
        match self {
            Matcher::Exhaustive => "exhaustive_matcher",
            Matcher::VocabTree => "vocab_tree_matcher",
            Matcher::Sequential => "sequential_matcher",
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::Exhaustive
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Matcher {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|matcher| matcher.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownMatcher(s.to_owned()))
    }
}

/// Validated options handed to the COLMAP pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColmapOptions {
    /// Index of the GPU handed to SIFT extraction.
    pub gpu_index: i32,
    pub camera_model: CameraModel,
    pub matcher: Matcher,
}

impl ColmapOptions {
    /// Validate raw option strings. Fails fast on an unknown camera model or
    /// matcher so a misconfigured session is never constructed.
    pub fn new(gpu_index: i32, camera_model: &str, matcher: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            gpu_index,
            camera_model: camera_model.parse()?,
            matcher: matcher.parse()?,
        })
    }
}

impl Default for ColmapOptions {
    fn default() -> Self {
        Self {
            gpu_index: 0,
            camera_model: CameraModel::default(),
            matcher: Matcher::default(),
        }
    }
}
