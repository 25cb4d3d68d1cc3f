//! Augmentation orchestrator.
//!
//! One pass over a dataset: every sample gets exactly one randomly chosen
//! geometric transform, then the augmented samples and the untouched
//! originals are handed to a [`SampleSink`].
//!
//! # Randomness
//!
//! The caller passes a single random source. Before any work starts the
//! orchestrator draws one seed per sample from it, in dataset order, and each
//! sample is augmented with its own `ChaCha8Rng`. A fixed seed therefore gives
//! the same output whether the pass runs sequentially or on the rayon pool.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use augmentor_core::{Dataset, ImageDimensions, Result, Sample};
use image::DynamicImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::transforms::{random_augment, AppliedTransform, TransformKind};
use crate::writer::{DirectoryWriter, SampleSink};

/// A sample after exactly one transform, sharing label and file name with
/// its source
#[derive(Debug, Clone)]
pub struct AugmentedSample {
    pub image: DynamicImage,
    pub label: String,
    pub file_name: String,
    pub transform: AppliedTransform,
}

impl AugmentedSample {
    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::of(&self.image)
    }
}

/// What happened to one sample
#[derive(Debug, Clone, Serialize)]
pub struct SampleOutcome {
    pub label: String,
    pub file_name: String,
    pub transform: AppliedTransform,
    pub input: ImageDimensions,
    pub output: ImageDimensions,
}

/// Summary of an augmentation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct AugmentationReport {
    /// One entry per sample, in dataset order
    pub samples: Vec<SampleOutcome>,
    /// Every location the sink wrote
    pub written: Vec<PathBuf>,
}

impl AugmentationReport {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// How often each transform kind was chosen; kinds never chosen map to 0
    pub fn counts_by_kind(&self) -> BTreeMap<TransformKind, usize> {
        let mut counts: BTreeMap<TransformKind, usize> =
            TransformKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        for outcome in &self.samples {
            *counts.entry(outcome.transform.kind()).or_default() += 1;
        }
        counts
    }
}

/// Runs augmentation passes and forwards the results to a sink
pub struct Augmentor<S> {
    sink: S,
    parallel: bool,
}

impl<S: SampleSink> Augmentor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            parallel: false,
        }
    }

    /// Augment samples on the rayon pool instead of one by one
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Augments every sample without persisting anything.
    ///
    /// Stops at the first failing sample and returns its error.
    pub fn augment_samples<R: Rng>(
        &self,
        dataset: &Dataset,
        rng: &mut R,
    ) -> Result<Vec<AugmentedSample>> {
        let seeds: Vec<u64> = (0..dataset.len()).map(|_| rng.gen()).collect();
        let samples = dataset.samples();

        if self.parallel {
            samples
                .par_iter()
                .zip(seeds.par_iter())
                .map(|(sample, &seed)| augment_sample(sample, seed))
                .collect()
        } else {
            samples
                .iter()
                .zip(&seeds)
                .map(|(sample, &seed)| augment_sample(sample, seed))
                .collect()
        }
    }

    /// Augments the dataset and persists augmented samples plus originals.
    pub fn augment<R: Rng>(&self, dataset: &Dataset, rng: &mut R) -> Result<AugmentationReport> {
        let augmented = self.augment_samples(dataset, rng)?;
        let written = self.sink.persist(&augmented, dataset)?;

        let samples = dataset
            .iter()
            .zip(&augmented)
            .map(|(original, result)| SampleOutcome {
                label: result.label.clone(),
                file_name: result.file_name.clone(),
                transform: result.transform,
                input: original.dimensions(),
                output: result.dimensions(),
            })
            .collect();

        debug!(
            samples = dataset.len(),
            files = written.len(),
            "augmentation pass complete"
        );

        Ok(AugmentationReport { samples, written })
    }
}

/// Augments one sample with a generator seeded from `seed`
pub fn augment_sample(sample: &Sample, seed: u64) -> Result<AugmentedSample> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (transform, image) = random_augment(&sample.image, &mut rng)?;

    trace!(
        label = %sample.label,
        file_name = %sample.file_name,
        %transform,
        "augmented sample"
    );

    Ok(AugmentedSample {
        image,
        label: sample.label.clone(),
        file_name: sample.file_name.clone(),
        transform,
    })
}

/// Augments `dataset` into `output_root` with default writer settings
pub fn augment_to_directory<R: Rng>(
    dataset: &Dataset,
    output_root: impl AsRef<Path>,
    rng: &mut R,
) -> Result<AugmentationReport> {
    Augmentor::new(DirectoryWriter::new(output_root.as_ref())).augment(dataset, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use augmentor_core::Error;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        }))
    }

    fn cat_and_dog() -> Dataset {
        Dataset::from_parts(
            vec![create_test_image(32, 32), create_test_image(16, 16)],
            vec!["cat".to_string(), "dog".to_string()],
            vec!["a.jpg".to_string(), "b.jpg".to_string()],
        )
        .unwrap()
    }

    fn larger_dataset(n: u32) -> Dataset {
        Dataset::from_parts(
            (0..n).map(|i| create_test_image(10 + i, 12)).collect(),
            (0..n).map(|i| format!("class{}", i % 4)).collect(),
            (0..n).map(|i| format!("img_{:03}.png", i)).collect(),
        )
        .unwrap()
    }

    /// Keeps what it was handed, writes nothing
    #[derive(Default)]
    struct RecordingSink {
        calls: RefCell<Vec<(Vec<String>, Vec<String>)>>,
    }

    impl SampleSink for RecordingSink {
        fn persist(
            &self,
            augmented: &[AugmentedSample],
            originals: &Dataset,
        ) -> Result<Vec<PathBuf>> {
            let augmented_names = augmented.iter().map(|s| s.file_name.clone()).collect();
            let original_names = originals.iter().map(|s| s.file_name.clone()).collect();
            self.calls.borrow_mut().push((augmented_names, original_names));
            Ok(Vec::new())
        }
    }

    struct FailingSink;

    impl SampleSink for FailingSink {
        fn persist(&self, _: &[AugmentedSample], _: &Dataset) -> Result<Vec<PathBuf>> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk unavailable",
            )))
        }
    }

    fn list_files(root: &Path) -> Vec<String> {
        let mut files = Vec::new();
        for label_dir in fs::read_dir(root).unwrap() {
            let label_dir = label_dir.unwrap().path();
            for file in fs::read_dir(&label_dir).unwrap() {
                let path = file.unwrap().path();
                let relative = path.strip_prefix(root).unwrap();
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        files.sort();
        files
    }

    fn mean_abs_diff(a: &DynamicImage, b: &DynamicImage) -> f64 {
        let a = a.to_rgb8();
        let b = b.to_rgb8();
        let total: u64 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(x, y)| (*x as i64 - *y as i64).unsigned_abs())
            .sum();
        total as f64 / a.as_raw().len() as f64
    }

    #[test]
    fn test_every_sample_gets_one_transform() {
        let dataset = larger_dataset(12);
        let augmentor = Augmentor::new(RecordingSink::default());
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let augmented = augmentor.augment_samples(&dataset, &mut rng).unwrap();

        assert_eq!(augmented.len(), dataset.len());
        for (original, result) in dataset.iter().zip(&augmented) {
            assert_eq!(result.label, original.label);
            assert_eq!(result.file_name, original.file_name);
        }
    }

    #[test]
    fn test_originals_are_left_untouched() {
        let dataset = cat_and_dog();
        let before = dataset.clone();
        let augmentor = Augmentor::new(RecordingSink::default());

        augmentor
            .augment(&dataset, &mut ChaCha8Rng::seed_from_u64(11))
            .unwrap();

        for (a, b) in dataset.iter().zip(before.iter()) {
            assert_eq!(a.image, b.image);
        }
    }

    #[test]
    fn test_sink_receives_augmented_and_originals() {
        let dataset = cat_and_dog();
        let augmentor = Augmentor::new(RecordingSink::default());

        let report = augmentor
            .augment(&dataset, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();

        let calls = augmentor.sink().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["a.jpg", "b.jpg"]);
        assert_eq!(calls[0].1, vec!["a.jpg", "b.jpg"]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.samples[0].input, ImageDimensions::new(32, 32, 3));
    }

    #[test]
    fn test_same_seed_same_result() {
        let dataset = larger_dataset(10);
        let augmentor = Augmentor::new(RecordingSink::default());

        let first = augmentor
            .augment_samples(&dataset, &mut ChaCha8Rng::seed_from_u64(77))
            .unwrap();
        let second = augmentor
            .augment_samples(&dataset, &mut ChaCha8Rng::seed_from_u64(77))
            .unwrap();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.transform, b.transform);
            assert_eq!(a.image, b.image);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dataset = larger_dataset(24);
        let sequential = Augmentor::new(RecordingSink::default());
        let parallel = Augmentor::new(RecordingSink::default()).with_parallel(true);

        let seq = sequential
            .augment_samples(&dataset, &mut ChaCha8Rng::seed_from_u64(2024))
            .unwrap();
        let par = parallel
            .augment_samples(&dataset, &mut ChaCha8Rng::seed_from_u64(2024))
            .unwrap();

        assert_eq!(seq.len(), par.len());
        for (a, b) in seq.iter().zip(&par) {
            assert_eq!(a.file_name, b.file_name);
            assert_eq!(a.transform, b.transform);
            assert_eq!(a.image, b.image);
        }
    }

    #[test]
    fn test_invalid_image_propagates_before_persisting() {
        let dataset = Dataset::from_parts(
            vec![create_test_image(8, 8), DynamicImage::new_rgb8(0, 5)],
            vec!["cat".to_string(), "cat".to_string()],
            vec!["ok.jpg".to_string(), "broken.jpg".to_string()],
        )
        .unwrap();
        let augmentor = Augmentor::new(RecordingSink::default());

        let result = augmentor.augment(&dataset, &mut ChaCha8Rng::seed_from_u64(3));

        assert!(matches!(result, Err(Error::InvalidImage(_))));
        assert!(augmentor.sink().calls.borrow().is_empty());
    }

    #[test]
    fn test_sink_failure_propagates() {
        let augmentor = Augmentor::new(FailingSink);
        let err = augmentor
            .augment(&cat_and_dog(), &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap_err();
        assert!(err.is_io_failure());
    }

    #[test]
    fn test_empty_dataset() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("out");
        let dataset = Dataset::from_parts(Vec::new(), Vec::new(), Vec::new()).unwrap();

        let report =
            augment_to_directory(&dataset, &root, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();

        assert!(report.is_empty());
        assert!(report.written.is_empty());
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_counts_by_kind() {
        let dataset = larger_dataset(40);
        let augmentor = Augmentor::new(RecordingSink::default());

        let report = augmentor
            .augment(&dataset, &mut ChaCha8Rng::seed_from_u64(8))
            .unwrap();
        let counts = report.counts_by_kind();

        assert_eq!(counts.len(), 4);
        assert_eq!(counts.values().sum::<usize>(), 40);
        for (kind, count) in &counts {
            let expected = report
                .samples
                .iter()
                .filter(|outcome| outcome.transform.kind() == *kind)
                .count();
            assert_eq!(*count, expected, "count for {}", kind);
        }

        let empty = AugmentationReport::default().counts_by_kind();
        assert_eq!(empty.len(), 4);
        assert!(empty.values().all(|&count| count == 0));
    }

    #[test]
    fn test_end_to_end_directory_layout() {
        let temp_dir = TempDir::new().unwrap();
        let dataset = cat_and_dog();

        let report =
            augment_to_directory(&dataset, temp_dir.path(), &mut ChaCha8Rng::seed_from_u64(42))
                .unwrap();

        assert_eq!(
            list_files(temp_dir.path()),
            vec!["cat/a.jpg", "cat/a_augmented.jpg", "dog/b.jpg", "dog/b_augmented.jpg"]
        );
        assert_eq!(report.written.len(), 4);

        for (sample, outcome) in dataset.iter().zip(&report.samples) {
            let dir = temp_dir.path().join(&sample.label);
            let stem = &sample.file_name[..sample.file_name.len() - 4];
            let original = image::open(dir.join(format!("{}.jpg", stem))).unwrap();
            let augmented = image::open(dir.join(format!("{}_augmented.jpg", stem))).unwrap();

            // Plain copy matches the input up to JPEG loss.
            assert_eq!(original.dimensions(), sample.image.dimensions());
            assert!(mean_abs_diff(&original, &sample.image) < 6.0);

            // Augmented copy carries the transformed size.
            assert_eq!(
                augmented.dimensions(),
                (outcome.output.width, outcome.output.height)
            );

            // A scale that rounds back to the input size can reproduce the
            // input; every other transform changes pixels.
            let same_size_scale = outcome.transform.kind() == TransformKind::Scale
                && outcome.output == outcome.input;
            if !same_size_scale {
                assert_ne!(augmented.to_rgb8(), original.to_rgb8());
            }
        }
    }
}
