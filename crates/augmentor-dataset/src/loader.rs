//! Loading of labeled image folders.
//!
//! The expected layout is one sub-directory per label, each holding the
//! images of that label:
//!
//! ```text
//! root/
//!   cat/a.jpg
//!   cat/b.png
//!   dog/c.jpg
//! ```

use std::path::{Path, PathBuf};

use augmentor_core::{Dataset, Error, Result, Sample};
use image::DynamicImage;
use tracing::debug;

/// Image file extensions picked up by the loader, compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

/// An image file found under a label directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledImagePath {
    pub label: String,
    pub path: PathBuf,
    pub file_name: String,
}

/// Image loader for label-partitioned folders
pub struct ImageLoader {
    /// Root directory containing one folder per label
    root_dir: PathBuf,
}

impl ImageLoader {
    /// Creates a new image loader
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Decodes an image from a path
    pub fn load_image(&self, path: &Path) -> Result<DynamicImage> {
        image::open(path).map_err(|e| Error::ImageLoad(path.to_path_buf(), e.to_string()))
    }

    /// Label directories under the root, sorted by name
    pub fn label_directories(&self) -> Result<Vec<PathBuf>> {
        check_directory(&self.root_dir)?;

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.root_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        Ok(dirs)
    }

    /// Image files directly inside `dir`, sorted by name
    pub fn scan_directory(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        check_directory(dir)?;

        let mut images = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                images.push(path);
            }
        }
        images.sort();

        Ok(images)
    }

    /// Every image of every label, grouped by label in name order
    pub fn scan_labeled_images(&self) -> Result<Vec<LabeledImagePath>> {
        let mut found = Vec::new();

        for dir in self.label_directories()? {
            let label = utf8_file_name(&dir)?;

            let images = self.scan_directory(&dir)?;
            debug!(%label, count = images.len(), "scanned label directory");

            for path in images {
                found.push(LabeledImagePath {
                    label: label.clone(),
                    file_name: utf8_file_name(&path)?,
                    path,
                });
            }
        }

        Ok(found)
    }

    /// Decodes one scanned entry into a sample
    pub fn load_sample(&self, entry: &LabeledImagePath) -> Result<Sample> {
        let image = self.load_image(&entry.path)?;
        Sample::new(image, entry.label.as_str(), entry.file_name.as_str())
    }

    /// Scans the root and decodes every image into a dataset
    pub fn load_dataset(&self) -> Result<Dataset> {
        let samples = self
            .scan_labeled_images()?
            .iter()
            .map(|entry| self.load_sample(entry))
            .collect::<Result<Vec<_>>>()?;

        Dataset::from_samples(samples)
    }
}

fn check_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(Error::NotFound(format!(
            "Directory not found: {}",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }
    Ok(())
}

/// Labels and output names are derived from file names, so they must be UTF-8
fn utf8_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidInput(format!("Name is not valid UTF-8: {}", path.display()))
        })
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
