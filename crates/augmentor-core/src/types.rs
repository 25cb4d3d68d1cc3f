//! Core type definitions: samples, datasets and image dimensions.

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::naming::{file_stem, validate_label};
use crate::{Error, Result};

/// Image dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ImageDimensions {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of channels (e.g., 3 for RGB)
    pub channels: u32,
}

impl ImageDimensions {
    /// Creates new image dimensions
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Reads the dimensions of a decoded image
    pub fn of(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.color().channel_count() as u32)
    }

    /// True when either spatial dimension is zero
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// One labeled image of the input dataset
#[derive(Debug, Clone)]
pub struct Sample {
    /// Decoded pixel data
    pub image: DynamicImage,
    /// Class label, used as the output directory name
    pub label: String,
    /// Source file name the output names are derived from
    pub file_name: String,
}

impl Sample {
    /// Creates a sample, checking that label and file name can be persisted
    pub fn new(
        image: DynamicImage,
        label: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self> {
        let sample = Self {
            image,
            label: label.into(),
            file_name: file_name.into(),
        };
        sample.validate()?;
        Ok(sample)
    }

    /// Dimensions of the sample image
    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::of(&self.image)
    }

    fn validate(&self) -> Result<()> {
        validate_label(&self.label)?;
        file_stem(&self.file_name)?;
        Ok(())
    }
}

/// Ordered collection of samples
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Builds a dataset from three aligned sequences.
    ///
    /// The i-th image, label and file name form the i-th sample. The
    /// sequences must have equal length.
    pub fn from_parts(
        images: Vec<DynamicImage>,
        labels: Vec<String>,
        file_names: Vec<String>,
    ) -> Result<Self> {
        if images.len() != labels.len() || images.len() != file_names.len() {
            return Err(Error::InvalidInput(format!(
                "dataset sequences must have equal length (images: {}, labels: {}, file names: {})",
                images.len(),
                labels.len(),
                file_names.len()
            )));
        }

        let samples = images
            .into_iter()
            .zip(labels)
            .zip(file_names)
            .map(|((image, label), file_name)| Sample::new(image, label, file_name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { samples })
    }

    /// Builds a dataset from already constructed samples
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        for sample in &samples {
            sample.validate()?;
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct labels in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for sample in &self.samples {
            if !seen.contains(&sample.label.as_str()) {
                seen.push(sample.label.as_str());
            }
        }
        seen
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
