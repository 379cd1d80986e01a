//! Per-band Bazin fit.
//!
//! Given one band's `(mjd, flux)` series we:
//! - rescale time to start at zero (keeps `t0` near 0 instead of a calendar date)
//! - start from `A=0, B=0, t0=t[argmax flux], tfall=40, trise=-5`
//! - minimise `|flux - f(t)|` with Levenberg–Marquardt
//!
//! A band that cannot be fit is not an error for the caller: the result is a
//! tagged [`BandFit::Fallback`] whose parameters are all zero.

use nalgebra::{DMatrix, DVector};

use crate::domain::{BandSeries, BazinParams, N_PARAMS, SolverOptions};
use crate::math::{LmError, Residuals, levenberg_marquardt};
use crate::models::{evaluate, gradient};

/// Initial fall timescale (days).
const TFALL_GUESS: f64 = 40.0;
/// Initial rise timescale (days, negative by the model's sign convention).
const TRISE_GUESS: f64 = -5.0;

/// Why a band fell back to zeros.
#[derive(Debug, Clone, PartialEq)]
pub enum FitFailure {
    /// No observations in the band.
    Empty,
    /// Non-finite time or flux values.
    NonFiniteInput,
    /// The solver refused the problem.
    Solver(LmError),
    /// The solver returned non-finite parameters.
    NonFiniteResult,
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitFailure::Empty => write!(f, "no observations"),
            FitFailure::NonFiniteInput => write!(f, "non-finite time or flux"),
            FitFailure::Solver(e) => write!(f, "{e}"),
            FitFailure::NonFiniteResult => write!(f, "solver returned non-finite parameters"),
        }
    }
}

/// Outcome of one (object, band) task.
#[derive(Debug, Clone, PartialEq)]
pub enum BandFit {
    Fitted(BazinParams),
    Fallback(FitFailure),
}

impl BandFit {
    /// Parameters to write into the feature row (zeros on fallback).
    pub fn params(&self) -> BazinParams {
        match self {
            BandFit::Fitted(p) => *p,
            BandFit::Fallback(_) => BazinParams::ZERO,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, BandFit::Fitted(_))
    }
}

/// Fit one band series.
pub fn fit_band(series: &BandSeries, opts: &SolverOptions) -> BandFit {
    if series.is_empty() {
        return BandFit::Fallback(FitFailure::Empty);
    }
    match fit_lightcurve(series.mjd(), series.fluxcal(), opts) {
        Ok(p) => BandFit::Fitted(p),
        Err(e) => BandFit::Fallback(e),
    }
}

/// Fit the Bazin model to a raw `(time, flux)` series.
pub fn fit_lightcurve(time: &[f64], flux: &[f64], opts: &SolverOptions) -> Result<BazinParams, FitFailure> {
    if time.is_empty() {
        return Err(FitFailure::Empty);
    }
    if time.iter().chain(flux).any(|v| !v.is_finite()) {
        return Err(FitFailure::NonFiniteInput);
    }

    let t_min = time.iter().copied().fold(f64::INFINITY, f64::min);
    let scaled: Vec<f64> = time.iter().map(|t| t - t_min).collect();
    let guess = initial_guess(&scaled, flux);

    let problem = BandProblem {
        time: &scaled,
        flux,
    };
    let outcome = levenberg_marquardt(&problem, &guess.to_array(), opts).map_err(FitFailure::Solver)?;

    let mut p = [0.0; N_PARAMS];
    p.copy_from_slice(outcome.params.as_slice());
    let params = BazinParams::from_array(p);
    if !params.is_finite() {
        return Err(FitFailure::NonFiniteResult);
    }
    Ok(params)
}

/// Fixed starting point; only `t0` depends on the data.
pub fn initial_guess(scaled_time: &[f64], flux: &[f64]) -> BazinParams {
    // First index of the maximum, like numpy's argmax.
    let mut best = 0usize;
    for (i, &f) in flux.iter().enumerate() {
        if f > flux[best] {
            best = i;
        }
    }
    BazinParams {
        a: 0.0,
        b: 0.0,
        t0: scaled_time.get(best).copied().unwrap_or(0.0),
        tfall: TFALL_GUESS,
        trise: TRISE_GUESS,
    }
}

/// Residuals `|flux_i - f(t_i)|` for one band.
struct BandProblem<'a> {
    time: &'a [f64],
    flux: &'a [f64],
}

impl BandProblem<'_> {
    fn params(p: &DVector<f64>) -> BazinParams {
        BazinParams::from_array([p[0], p[1], p[2], p[3], p[4]])
    }
}

impl Residuals for BandProblem<'_> {
    fn len(&self) -> usize {
        self.time.len()
    }

    fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
        let params = Self::params(p);
        DVector::from_iterator(
            self.time.len(),
            self.time
                .iter()
                .zip(self.flux)
                .map(|(&t, &y)| (y - evaluate(t, &params)).abs()),
        )
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let params = Self::params(p);
        let mut jac = DMatrix::<f64>::zeros(self.time.len(), N_PARAMS);
        for (i, (&t, &y)) in self.time.iter().zip(self.flux).enumerate() {
            // d|y - f|/dp = -sign(y - f) · df/dp, with sign(0) taken as +1.
            let sign = if y - evaluate(t, &params) >= 0.0 { 1.0 } else { -1.0 };
            let g = gradient(t, &params);
            for j in 0..N_PARAMS {
                jac[(i, j)] = -sign * g[j];
            }
        }
        jac
    }
}
