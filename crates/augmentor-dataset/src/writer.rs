//! Persistence of augmented and original samples.
//!
//! [`DirectoryWriter`] lays samples out as `<root>/<label>/<stem>.jpg` and
//! `<root>/<label>/<stem>_augmented.jpg`.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use augmentor_core::naming::{augmented_path, original_path};
use augmentor_core::{AugmentConfig, Dataset, Error, OutputConfig, Result, DEFAULT_JPEG_QUALITY};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use rayon::prelude::*;
use tracing::debug;

use crate::augmentation::AugmentedSample;

/// Receives the results of an augmentation pass.
pub trait SampleSink {
    /// Persists every augmented sample and every original, returning the
    /// locations written.
    fn persist(&self, augmented: &[AugmentedSample], originals: &Dataset) -> Result<Vec<PathBuf>>;
}

/// Writes JPEG files into a label-partitioned directory tree
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    root: PathBuf,
    jpeg_quality: u8,
    parallel: bool,
}

struct WriteJob<'a> {
    path: PathBuf,
    image: &'a DynamicImage,
}

impl DirectoryWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            parallel: false,
        }
    }

    /// Takes JPEG quality and parallelism from a run configuration
    pub fn from_config(root: impl Into<PathBuf>, config: &AugmentConfig) -> Result<Self> {
        Ok(Self::new(root)
            .with_jpeg_quality(config.output.jpeg_quality)?
            .with_parallel(config.parallel))
    }

    /// Quality outside 1..=100 is rejected with the same error as the config
    pub fn with_jpeg_quality(mut self, quality: u8) -> Result<Self> {
        OutputConfig {
            jpeg_quality: quality,
        }
        .validate()?;
        self.jpeg_quality = quality;
        Ok(self)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encodes `image` as JPEG at `path`, creating parent directories.
    ///
    /// Grayscale images stay grayscale; everything else is written as RGB.
    pub fn write_image(&self, path: &Path, image: &DynamicImage) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::CreateDir(parent.to_path_buf(), e))?;
        }

        let file =
            File::create(path).map_err(|e| Error::ImageWrite(path.to_path_buf(), e.to_string()))?;
        let mut writer = BufWriter::new(file);

        let encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
        let encoded = match image {
            DynamicImage::ImageLuma8(buf) => buf.write_with_encoder(encoder),
            other => other.to_rgb8().write_with_encoder(encoder),
        };
        encoded.map_err(|e| Error::ImageWrite(path.to_path_buf(), e.to_string()))?;

        writer
            .flush()
            .map_err(|e| Error::ImageWrite(path.to_path_buf(), e.to_string()))
    }

    /// Resolves every output path and rejects runs where two files would
    /// land on the same path.
    fn plan<'a>(
        &self,
        augmented: &'a [AugmentedSample],
        originals: &'a Dataset,
    ) -> Result<Vec<WriteJob<'a>>> {
        let mut jobs = Vec::with_capacity(augmented.len() + originals.len());

        for sample in augmented {
            jobs.push(WriteJob {
                path: augmented_path(&self.root, &sample.label, &sample.file_name)?,
                image: &sample.image,
            });
        }
        for sample in originals {
            jobs.push(WriteJob {
                path: original_path(&self.root, &sample.label, &sample.file_name)?,
                image: &sample.image,
            });
        }

        let mut seen = HashSet::with_capacity(jobs.len());
        for job in &jobs {
            if !seen.insert(job.path.as_path()) {
                return Err(Error::InvalidInput(format!(
                    "two samples map to the same output file '{}'",
                    job.path.display()
                )));
            }
        }

        Ok(jobs)
    }

    fn write_job(&self, job: &WriteJob<'_>) -> Result<PathBuf> {
        self.write_image(&job.path, job.image)?;
        debug!(path = %job.path.display(), "wrote image");
        Ok(job.path.clone())
    }
}

impl SampleSink for DirectoryWriter {
    fn persist(&self, augmented: &[AugmentedSample], originals: &Dataset) -> Result<Vec<PathBuf>> {
        let jobs = self.plan(augmented, originals)?;

        fs::create_dir_all(&self.root).map_err(|e| Error::CreateDir(self.root.clone(), e))?;

        if self.parallel {
            jobs.par_iter().map(|job| self.write_job(job)).collect()
        } else {
            jobs.iter().map(|job| self.write_job(job)).collect()
        }
    }
}
