//! Command-line parsing for the light-curve feature extractor.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting and I/O code; `app` turns these structs into config values.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::data::DEFAULT_BASE_URL;
use crate::domain::{DatasetVariant, Split, Survey};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lcfeat", version, about = "Supernova light-curve ingestion and Bazin feature extraction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serialize raw simulation tables (`*HEAD*.csv` / `*PHOT*.csv`) into record collections.
    Ingest(IngestArgs),
    /// Fetch the train/test record collections into a local data directory.
    Download(DownloadArgs),
    /// Fit Bazin curves and print (or export) the feature matrix summary.
    Extract(ExtractArgs),
    /// Write a seeded synthetic record collection.
    Simulate(SimulateArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct IngestArgs {
    /// Simulation directories to serialize.
    #[arg(required = true, value_name = "DIR")]
    pub directories: Vec<PathBuf>,

    /// Band alphabet of the survey.
    #[arg(long, value_enum, default_value_t = Survey::Lsst)]
    pub survey: Survey,

    /// Where to write `<dir>_train.json.gz` / `<dir>_target.json.gz`.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Print the total elapsed time.
    #[arg(long)]
    pub timed: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct DownloadArgs {
    #[arg(long, value_enum, default_value_t = Survey::Des)]
    pub survey: Survey,

    /// Only fetch one variant (default: both full and reduced).
    #[arg(long, value_enum)]
    pub variant: Option<DatasetVariant>,

    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Debug, Parser, Clone)]
pub struct ExtractArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Survey::Des)]
    pub survey: Survey,

    #[arg(long, value_enum, default_value_t = Split::Train)]
    pub split: Split,

    /// `full` or the `reduced` (`_mini`) dataset.
    #[arg(long, value_enum, default_value_t = DatasetVariant::Full)]
    pub variant: DatasetVariant,

    /// Keep only this leading fraction of objects, in [0, 1].
    #[arg(long)]
    pub fraction: Option<f64>,

    /// Enable the signal-quality cut with this SNR threshold.
    #[arg(long, value_name = "SNR")]
    pub min_snr: Option<f64>,

    /// Samples above `--min-snr` each band needs more than.
    #[arg(long, default_value_t = 3, requires = "min_snr")]
    pub min_count: usize,

    /// Residual evaluations per band fit.
    #[arg(long, default_value_t = 600)]
    pub max_evaluations: usize,

    /// Relative cost-reduction tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub ftol: f64,

    /// Relative step tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub xtol: f64,

    /// Scaled gradient tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub gtol: f64,

    /// Export features (+ labels) to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output collection (`.json.gz`).
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = Survey::Des)]
    pub survey: Survey,

    /// Number of objects.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Gaussian flux noise (standard deviation).
    #[arg(long, default_value_t = 1.0)]
    pub noise: f64,

    /// Probability that a band has no observations.
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,
}
