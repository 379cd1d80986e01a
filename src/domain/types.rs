//! Shared configuration types and fit outputs.
//!
//! These are kept small and `Copy` where possible so they can be:
//!
//! - built from CLI flags (`clap::ValueEnum`)
//! - passed by value into the library entry points
//! - echoed back in reports

use std::path::PathBuf;

use clap::ValueEnum;

/// Number of Bazin parameters fitted per band.
pub const N_PARAMS: usize = 5;

/// Survey flavour, which fixes the ordered band alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Survey {
    /// Wide survey (DES-like): `g r i z`.
    Des,
    /// Deep survey (LSST-like): `u g r i z Y`.
    Lsst,
}

impl Survey {
    /// Ordered band alphabet. Feature columns follow this order.
    pub fn bands(self) -> &'static [char] {
        match self {
            Survey::Des => &['g', 'r', 'i', 'z'],
            Survey::Lsst => &['u', 'g', 'r', 'i', 'z', 'Y'],
        }
    }

    pub fn contains(self, band: char) -> bool {
        self.bands().contains(&band)
    }

    /// Lowercase name used in file names (`des_train.json.gz`).
    pub fn name(self) -> &'static str {
        match self {
            Survey::Des => "des",
            Survey::Lsst => "lsst",
        }
    }

    /// Width of one feature row: `bands × N_PARAMS`.
    pub fn feature_len(self) -> usize {
        self.bands().len() * N_PARAMS
    }
}

/// Which half of the published dataset to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// Full dataset or the reduced fast-iteration copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetVariant {
    Full,
    Reduced,
}

impl DatasetVariant {
    /// File-name suffix placed between the split name and the extension.
    pub fn suffix(self) -> &'static str {
        match self {
            DatasetVariant::Full => "",
            DatasetVariant::Reduced => "_mini",
        }
    }
}

/// Bazin fit parameters for one band.
///
/// `t0` is expressed relative to the first observation of the band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BazinParams {
    pub a: f64,
    pub b: f64,
    pub t0: f64,
    pub tfall: f64,
    pub trise: f64,
}

impl BazinParams {
    /// The fallback result for bands that could not be fit.
    pub const ZERO: BazinParams = BazinParams {
        a: 0.0,
        b: 0.0,
        t0: 0.0,
        tfall: 0.0,
        trise: 0.0,
    };

    /// Column labels, in the same order as [`BazinParams::to_array`].
    pub const NAMES: [&'static str; N_PARAMS] = ["a", "b", "t0", "tfall", "trise"];

    pub fn from_array(p: [f64; N_PARAMS]) -> Self {
        Self {
            a: p[0],
            b: p[1],
            t0: p[2],
            tfall: p[3],
            trise: p[4],
        }
    }

    pub fn to_array(self) -> [f64; N_PARAMS] {
        [self.a, self.b, self.t0, self.tfall, self.trise]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Signal-quality cut: keep objects whose every band has more than
/// `min_count` samples with `flux / err > min_snr`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnrCut {
    pub min_snr: f64,
    pub min_count: usize,
}

/// Levenberg–Marquardt settings.
///
/// Defaults mirror the usual MINPACK ones: tolerances of `1e-8` and an
/// evaluation budget of `100 × (n_params + 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Maximum number of residual evaluations per fit.
    pub max_evaluations: usize,
    /// Relative reduction of the cost below which the fit stops.
    pub ftol: f64,
    /// Relative step size below which the fit stops.
    pub xtol: f64,
    /// Scaled gradient norm below which the fit stops.
    pub gtol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 100 * (N_PARAMS + 1),
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
        }
    }
}

/// A full `extract` run as understood by the pipeline.
///
/// Derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub data_dir: PathBuf,
    pub survey: Survey,
    pub split: Split,
    pub variant: DatasetVariant,
    /// Keep only this leading fraction of objects (`None` keeps all).
    pub fraction: Option<f64>,
    /// Optional signal-quality cut applied before fitting.
    pub snr_cut: Option<SnrCut>,
    pub solver: SolverOptions,
    /// Write the feature matrix (plus labels) to this CSV.
    pub export: Option<PathBuf>,
}

/// Settings for batch ingestion of raw survey tables.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub directories: Vec<PathBuf>,
    pub survey: Survey,
    pub out_dir: PathBuf,
    pub timed: bool,
}

/// Settings for synthetic light-curve generation.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub survey: Survey,
    pub count: usize,
    pub seed: u64,
    /// Gaussian flux noise (standard deviation, flux units).
    pub noise: f64,
    /// Probability that a band has no observations at all.
    pub dropout: f64,
    pub epochs_per_band: usize,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            survey: Survey::Des,
            count: 100,
            seed: 42,
            noise: 1.0,
            dropout: 0.1,
            epochs_per_band: 20,
        }
    }
}
