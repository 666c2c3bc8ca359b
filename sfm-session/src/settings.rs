use serde::{Deserialize, Serialize};
use sfm_colmap::{ColmapOptions, ConfigError};

/// The settings for a reconstruction session and its viewer.
///
/// Every field has a default, so settings files only need to name what they
/// change.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// GPU index handed to feature extraction.
    #[serde(default = "default_gpu_index")]
    pub gpu_index: i32,
    /// COLMAP camera model name, e.g. `OPENCV` or `PINHOLE`.
    #[serde(default = "default_camera_model")]
    pub camera_model: String,
    /// COLMAP matcher name: `exhaustive_matcher`, `vocab_tree_matcher`, or
    /// `sequential_matcher`.
    #[serde(default = "default_matcher")]
    pub matcher: String,
    /// Keep every n-th image when preparing a dataset.
    #[serde(default = "default_image_downsample_factor")]
    pub image_downsample_factor: usize,
    /// Depth of the rendered camera frustums in world units.
    #[serde(default = "default_camera_size")]
    pub camera_size: f64,
    /// Frustum color as RGB in `[0, 1]`.
    #[serde(default = "default_camera_color")]
    pub camera_color: [f64; 3],
    /// Rendered point size in pixels.
    #[serde(default = "default_point_size")]
    pub point_size: f64,
    /// Viewer background as RGB bytes.
    #[serde(default = "default_background_color")]
    pub background_color: [u8; 3],
}

impl SessionSettings {
    /// Validate the engine-facing fields into [`ColmapOptions`]. Fails fast
    /// on an unknown camera model or matcher name.
    pub fn colmap_options(&self) -> Result<ColmapOptions, ConfigError> {
        ColmapOptions::new(self.gpu_index, &self.camera_model, &self.matcher)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            gpu_index: default_gpu_index(),
            camera_model: default_camera_model(),
            matcher: default_matcher(),
            image_downsample_factor: default_image_downsample_factor(),
            camera_size: default_camera_size(),
            camera_color: default_camera_color(),
            point_size: default_point_size(),
            background_color: default_background_color(),
        }
    }
}

fn default_gpu_index() -> i32 {
    0
}

fn default_camera_model() -> String {
    "OPENCV".to_owned()
}

fn default_matcher() -> String {
    "exhaustive_matcher".to_owned()
}

fn default_image_downsample_factor() -> usize {
    1
}

fn default_camera_size() -> f64 {
    0.3
}

fn default_camera_color() -> [f64; 3] {
    [0.784, 0.526, 0.973]
}

fn default_point_size() -> f64 {
    5.0
}

fn default_background_color() -> [u8; 3] {
    [0, 0, 0]
}
