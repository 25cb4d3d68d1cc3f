//! Labeled image augmentation library.
//!
//! This crate provides the geometric transforms, the orchestrator that picks
//! one transform per image, the directory writer for the results and a loader
//! for label-partitioned image folders.

pub mod augmentation;
pub mod loader;
pub mod transforms;
pub mod writer;

pub use augmentation::{
    augment_sample, augment_to_directory, AugmentationReport, AugmentedSample, Augmentor,
    SampleOutcome,
};
pub use loader::{ImageLoader, LabeledImagePath};
pub use transforms::{random_augment, AppliedTransform, FlipAxis, TransformKind};
pub use writer::{DirectoryWriter, SampleSink};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::augmentation::*;
    pub use crate::loader::*;
    pub use crate::transforms::*;
    pub use crate::writer::*;
}
