use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extensions recognized as images when scanning a dataset folder.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff", "svg"];

/// The on-disk layout expected beneath a dataset root:
///
/// ```text
/// <root>/
///   images/              input images for the reconstruction
///   colmap/database.db   cached feature/match database
///   colmap/sparse/       cached sparse reconstruction output
/// ```
#[derive(Debug, Clone)]
pub struct DatasetWorkspace {
    root: PathBuf,
}

impl DatasetWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the input images.
    pub fn image_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// The engine's feature/match database file.
    pub fn database_path(&self) -> PathBuf {
        self.root.join("colmap").join("database.db")
    }

    /// Directory holding the engine's sparse reconstruction output.
    pub fn sparse_dir(&self) -> PathBuf {
        self.root.join("colmap").join("sparse")
    }

    /// True only when all cached artifacts of a prior run exist, meaning the
    /// estimation step can load them instead of recomputing.
    pub fn has_cached_artifacts(&self) -> bool {
        self.database_path().is_file() && self.image_dir().is_dir() && self.sparse_dir().is_dir()
    }
}

/// List the image files directly inside `dir`, sorted lexicographically by
/// path. Files whose extension is not in [`IMAGE_EXTENSIONS`]
/// (case-insensitive) are skipped.
pub fn list_image_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
