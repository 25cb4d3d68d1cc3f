//! Core types and utilities for the labeled image augmentor.
//!
//! This crate provides the data model (samples and datasets), the output
//! naming contract, the error type and the run configuration shared by the
//! dataset crate and the command-line tool.

pub mod cli;
pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use cli::{load_config, setup_cli_logging};
pub use config::{AugmentConfig, OutputConfig, DEFAULT_JPEG_QUALITY};
pub use error::{Error, Result};
pub use types::{Dataset, ImageDimensions, Sample};
