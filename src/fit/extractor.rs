//! Feature extraction: one Bazin fit per (object, band), assembled into a
//! fixed-width matrix.
//!
//! Layout: row `k` belongs to the `k`-th object of the input table; columns
//! are `bands × 5` in survey band order, each band block holding
//! `[a, b, t0, tfall, trise]`.
//!
//! Objects are independent, so they are fit in parallel. Each task returns a
//! tagged [`ObjectFit`]; the matrix is written afterwards from those results,
//! one row per task.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::domain::{BazinParams, LightCurveRecord, LightCurveTable, N_PARAMS, SolverOptions, Survey};
use crate::fit::fitter::{BandFit, FitFailure, fit_band};

/// Per-band outcomes for one object, in survey band order.
#[derive(Debug, Clone)]
pub struct ObjectFit {
    pub snid: i64,
    pub bands: Vec<(char, BandFit)>,
}

impl ObjectFit {
    /// Concatenated parameters (zeros for fallbacks), length `bands × 5`.
    pub fn feature_row(&self) -> Vec<f64> {
        self.bands
            .iter()
            .flat_map(|(_, fit)| fit.params().to_array())
            .collect()
    }
}

/// Feature matrix plus the per-band outcomes it was built from.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub survey: Survey,
    pub features: DMatrix<f64>,
    pub fits: Vec<ObjectFit>,
}

impl Extraction {
    pub fn fitted_count(&self) -> usize {
        self.fits
            .iter()
            .flat_map(|o| o.bands.iter())
            .filter(|(_, f)| f.is_fitted())
            .count()
    }

    pub fn fallback_count(&self) -> usize {
        self.fits.len() * self.survey.bands().len() - self.fitted_count()
    }

    /// Fallback count per band, in survey band order.
    pub fn fallbacks_by_band(&self) -> Vec<(char, usize)> {
        self.survey
            .bands()
            .iter()
            .enumerate()
            .map(|(j, &b)| {
                let n = self
                    .fits
                    .iter()
                    .filter(|o| !o.bands[j].1.is_fitted())
                    .count();
                (b, n)
            })
            .collect()
    }
}

/// Stateless Bazin feature extractor.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    solver: SolverOptions,
}

impl FeatureExtractor {
    pub fn new(solver: SolverOptions) -> Self {
        Self { solver }
    }

    /// Nothing is learned from training data.
    pub fn fit(&mut self, _table: &LightCurveTable, _labels: &[u8]) {}

    /// Feature matrix of shape `(table.len(), bands × 5)`.
    pub fn transform(&self, table: &LightCurveTable) -> DMatrix<f64> {
        self.transform_with_report(table).features
    }

    pub fn transform_with_report(&self, table: &LightCurveTable) -> Extraction {
        let survey = table.survey();
        let fits: Vec<ObjectFit> = table
            .rows()
            .par_iter()
            .map(|record| fit_object(record, survey, &self.solver))
            .collect();

        for object in &fits {
            for (band, fit) in &object.bands {
                if let BandFit::Fallback(reason) = fit {
                    log::debug!("object {} band {band}: zero features ({reason})", object.snid);
                }
            }
        }

        Extraction {
            survey,
            features: assemble(&fits, survey),
            fits,
        }
    }
}

/// Fit every band of one object.
pub fn fit_object(record: &LightCurveRecord, survey: Survey, opts: &SolverOptions) -> ObjectFit {
    let bands = survey
        .bands()
        .iter()
        .map(|&b| {
            let fit = match record.band(b) {
                Some(series) => fit_band(series, opts),
                None => BandFit::Fallback(FitFailure::Empty),
            };
            (b, fit)
        })
        .collect();
    ObjectFit {
        snid: record.snid(),
        bands,
    }
}

/// Zero-initialised matrix with row `k` taken from `fits[k]`.
pub fn assemble(fits: &[ObjectFit], survey: Survey) -> DMatrix<f64> {
    let mut out = DMatrix::<f64>::zeros(fits.len(), survey.feature_len());
    for (k, object) in fits.iter().enumerate() {
        for (j, v) in object.feature_row().into_iter().enumerate() {
            out[(k, j)] = v;
        }
    }
    out
}

/// Column names matching [`assemble`]'s layout (`g_a`, `g_b`, ...).
pub fn feature_names(survey: Survey) -> Vec<String> {
    let mut out = Vec::with_capacity(survey.feature_len());
    for &b in survey.bands() {
        for name in BazinParams::NAMES {
            out.push(format!("{b}_{name}"));
        }
    }
    debug_assert_eq!(out.len(), survey.bands().len() * N_PARAMS);
    out
}
