//! Configuration structures for augmentation runs.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default JPEG quality for written images
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Main configuration for an augmentation run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AugmentConfig {
    /// Random seed; a fresh one is drawn when absent
    pub seed: Option<u64>,
    /// Run transforms and writes on the rayon pool
    pub parallel: bool,
    /// Size of the rayon pool (defaults to the number of CPUs)
    pub num_workers: Option<usize>,
    /// Output encoding
    pub output: OutputConfig,
}

impl AugmentConfig {
    /// Validates value ranges
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == Some(0) {
            return Err(Error::Config(
                "num_workers must be at least 1".to_string(),
            ));
        }
        self.output.validate()
    }
}

/// Output encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality in 1..=100
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
