//! Bazin et al. (2009) transient light-curve model.
//!
//! ```text
//! f(t) = A · exp(-(t - t0) / tfall) / (1 + exp((t - t0) / trise)) + B
//! ```
//!
//! With `trise < 0` the denominator suppresses the curve before `t0` (the
//! rise) and `tfall > 0` gives the exponential decline afterwards.
//!
//! The fitter relies on two primitive operations, both pure functions:
//! - `evaluate` the flux at `t`
//! - fill the `gradient` of the flux w.r.t. the five parameters
//!
//! Both are guarded against exponential overflow: the ratio is computed in log
//! space with a stable softplus and the final exponent is saturated, so extreme
//! parameter values during the search produce large finite numbers rather than
//! `inf`/`NaN`.

use crate::domain::{BazinParams, N_PARAMS};

/// Largest exponent passed to `exp` (close to `ln(f64::MAX)`).
const MAX_EXPONENT: f64 = 700.0;

/// `ln(1 + e^x)` without overflow.
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// `1 / (1 + e^-x)` without overflow.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// The shape term `exp(-(t - t0)/tfall) / (1 + exp((t - t0)/trise))` and the
/// logistic weight `σ((t - t0)/trise)` used by the derivatives.
fn shape(t: f64, p: &BazinParams) -> (f64, f64) {
    let dt = t - p.t0;
    let u = -dt / p.tfall;
    let v = dt / p.trise;
    let log_x = (u - softplus(v)).min(MAX_EXPONENT);
    (log_x.exp(), sigmoid(v))
}

/// Model flux at time `t`.
pub fn evaluate(t: f64, p: &BazinParams) -> f64 {
    let (x, _) = shape(t, p);
    p.a * x + p.b
}

/// Partial derivatives of the model flux at `t`, in `BazinParams::to_array` order.
pub fn gradient(t: f64, p: &BazinParams) -> [f64; N_PARAMS] {
    let (x, s) = shape(t, p);
    let dt = t - p.t0;
    let ax = p.a * x;
    [
        x,
        1.0,
        ax * (1.0 / p.tfall + s / p.trise),
        ax * dt / (p.tfall * p.tfall),
        ax * s * dt / (p.trise * p.trise),
    ]
}
