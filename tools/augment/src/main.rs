//! Augmentation tool for labeled image folders.
//!
//! Reads `<input-dir>/<label>/<image>` files, applies one random geometric
//! transform to every image and writes both the original and the augmented
//! copy as JPEG into `<output-dir>/<label>/`.

use anyhow::{Context, Result};
use augmentor_core::{load_config, setup_cli_logging, AugmentConfig, Dataset, Sample};
use augmentor_dataset::{
    AugmentationReport, Augmentor, DirectoryWriter, ImageLoader, LabeledImagePath,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "augment")]
#[command(about = "Add one randomly transformed copy of every image in a labeled dataset", long_about = None)]
struct Cli {
    /// Input directory with one sub-directory per label
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Output directory for originals and augmented copies
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Decode, transform and write on the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Number of parallel workers (default: num_cpus)
    #[arg(short, long)]
    workers: Option<usize>,

    /// JPEG quality for written images (1-100)
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON report of every applied transform
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<AugmentConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AugmentConfig::default(),
        };

        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.workers.is_some() {
            config.num_workers = self.workers;
        }
        if let Some(quality) = self.jpeg_quality {
            config.output.jpeg_quality = quality;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_cli_logging(cli.verbose).context("Failed to set up logging")?;

    let config = cli.resolve_config()?;

    if let Some(n) = config.num_workers {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    info!("Augmenting {:?} into {:?}", cli.input_dir, cli.output_dir);

    let dataset = load_dataset(&cli.input_dir, config.parallel)?;
    if dataset.is_empty() {
        warn!("No images found under {:?}", cli.input_dir);
    }
    info!(
        "Loaded {} images in {} labels",
        dataset.len(),
        dataset.labels().len()
    );

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("Seed: {} (pass --seed {} to reproduce)", seed, seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let writer = DirectoryWriter::from_config(&cli.output_dir, &config)
        .context("Invalid output settings")?;
    let augmentor = Augmentor::new(writer).with_parallel(config.parallel);
    let report = augmentor
        .augment(&dataset, &mut rng)
        .context("Augmentation failed")?;

    log_summary(&report);

    if let Some(path) = &cli.report {
        write_report(path, &report)?;
        info!("Report saved to {:?}", path);
    }

    info!("✓ Augmentation complete!");
    Ok(())
}

/// Scans the input folder and decodes every image behind a progress bar
fn load_dataset(input_dir: &Path, parallel: bool) -> Result<Dataset> {
    let loader = ImageLoader::new(input_dir);
    let entries = loader
        .scan_labeled_images()
        .context("Failed to scan input directory")?;

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    pb.set_message("decoding");

    let load = |entry: &LabeledImagePath| {
        let sample = loader.load_sample(entry);
        pb.inc(1);
        sample
    };
    let samples: augmentor_core::Result<Vec<Sample>> = if parallel {
        entries.par_iter().map(load).collect()
    } else {
        entries.iter().map(load).collect()
    };

    pb.finish_with_message("decoded");

    let samples = samples.context("Failed to load input images")?;
    Dataset::from_samples(samples).context("Invalid dataset")
}

fn log_summary(report: &AugmentationReport) {
    info!("Augmented {} images, wrote {} files", report.len(), report.written.len());
    for (kind, count) in report.counts_by_kind() {
        info!("  {}: {}", kind, count);
    }
}

fn write_report(path: &Path, report: &AugmentationReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
    Ok(())
}
