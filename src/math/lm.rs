//! Levenberg–Marquardt nonlinear least squares.
//!
//! We minimise `Σ r_i(p)^2` for a small parameter vector `p`. Each iteration
//! solves the damped Gauss–Newton system
//!
//! ```text
//! [    J     ]       [ -r ]
//! [ √λ · D   ] δ  ≈  [  0 ]
//! ```
//!
//! in the least-squares sense with the SVD solver from `ols`, where `D` holds
//! the running maximum of the Jacobian column norms (Marquardt scaling, as in
//! MINPACK). Accepted steps shrink `λ` by 10, rejected ones grow it by 10.
//!
//! The solver is deterministic: no randomness, fixed update rules.

use nalgebra::{DMatrix, DVector};

use crate::domain::SolverOptions;
use crate::math::solve_least_squares;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

/// A least-squares problem: residual vector and its Jacobian.
pub trait Residuals {
    /// Number of residuals (rows of the Jacobian).
    fn len(&self) -> usize;

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// `∂r_i / ∂p_j`, shape `(len, params.len())`.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative cost reduction fell below `ftol`.
    Ftol,
    /// Relative step size fell below `xtol`.
    Xtol,
    /// Scaled gradient fell below `gtol` (includes an exact zero residual).
    Gtol,
    /// Evaluation budget exhausted.
    MaxEvaluations,
    /// No further descent possible (damping saturated or non-finite Jacobian).
    Stalled,
}

/// Conditions under which no solution is returned at all.
#[derive(Debug, Clone, PartialEq)]
pub enum LmError {
    /// Fewer residuals than parameters.
    Underdetermined { residuals: usize, params: usize },
    /// The residuals are not finite at the starting point.
    NonFiniteStart,
}

impl std::fmt::Display for LmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LmError::Underdetermined { residuals, params } => write!(
                f,
                "underdetermined: {residuals} residuals for {params} parameters"
            ),
            LmError::NonFiniteStart => write!(f, "residuals are not finite at the initial point"),
        }
    }
}

/// Solver output.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: DVector<f64>,
    /// Final `Σ r_i^2`.
    pub cost: f64,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Minimise the squared norm of `problem`'s residuals starting from `x0`.
pub fn levenberg_marquardt<P: Residuals>(
    problem: &P,
    x0: &[f64],
    opts: &SolverOptions,
) -> Result<LmOutcome, LmError> {
    let n = x0.len();
    let m = problem.len();
    if m < n {
        return Err(LmError::Underdetermined {
            residuals: m,
            params: n,
        });
    }

    let mut x = DVector::from_column_slice(x0);
    let mut r = problem.residuals(&x);
    let mut evaluations = 1usize;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(LmError::NonFiniteStart);
    }
    let mut cost = r.norm_squared();

    let mut scale = DVector::<f64>::zeros(n);
    let mut lambda = LAMBDA_INIT;

    let done = |x: DVector<f64>,
                cost: f64,
                evaluations: usize,
                termination: Termination|
     -> Result<LmOutcome, LmError> {
        Ok(LmOutcome {
            params: x,
            cost,
            evaluations,
            termination,
        })
    };

    loop {
        if cost == 0.0 {
            return done(x, cost, evaluations, Termination::Gtol);
        }

        let jac = problem.jacobian(&x);
        if jac.iter().any(|v| !v.is_finite()) {
            return done(x, cost, evaluations, Termination::Stalled);
        }

        // Marquardt scaling: running max of column norms, 1 for dead columns.
        let col_norms: Vec<f64> = (0..n).map(|k| jac.column(k).norm()).collect();
        for k in 0..n {
            scale[k] = scale[k].max(col_norms[k]);
        }

        // Gradient test (cosine between residual and Jacobian columns).
        let grad = jac.transpose() * &r;
        let r_norm = cost.sqrt();
        let gnorm = (0..n)
            .filter(|&k| col_norms[k] > 0.0)
            .map(|k| grad[k].abs() / (col_norms[k] * r_norm))
            .fold(0.0, f64::max);
        if gnorm <= opts.gtol {
            return done(x, cost, evaluations, Termination::Gtol);
        }

        // Inner loop: raise damping until a step reduces the cost.
        loop {
            if evaluations >= opts.max_evaluations {
                return done(x, cost, evaluations, Termination::MaxEvaluations);
            }

            let mut a = DMatrix::<f64>::zeros(m + n, n);
            a.view_mut((0, 0), (m, n)).copy_from(&jac);
            let sqrt_lambda = lambda.sqrt();
            for k in 0..n {
                let d = if scale[k] > 0.0 { scale[k] } else { 1.0 };
                a[(m + k, k)] = sqrt_lambda * d;
            }
            let mut b = DVector::<f64>::zeros(m + n);
            for i in 0..m {
                b[i] = -r[i];
            }

            let Some(step) = solve_least_squares(&a, &b) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    return done(x, cost, evaluations, Termination::Stalled);
                }
                continue;
            };

            let x_new = &x + &step;
            let r_new = problem.residuals(&x_new);
            evaluations += 1;
            let cost_new = r_new.norm_squared();
            let small_step = step.norm() <= opts.xtol * (x.norm() + opts.xtol);

            if cost_new.is_finite() && cost_new < cost {
                let reduction = (cost - cost_new) / cost;
                x = x_new;
                r = r_new;
                cost = cost_new;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);

                if reduction <= opts.ftol {
                    return done(x, cost, evaluations, Termination::Ftol);
                }
                if small_step {
                    return done(x, cost, evaluations, Termination::Xtol);
                }
                break;
            }

            if small_step {
                return done(x, cost, evaluations, Termination::Xtol);
            }
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return done(x, cost, evaluations, Termination::Stalled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y = a + b·x`
    struct Line {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl Residuals for Line {
        fn len(&self) -> usize {
            self.x.len()
        }

        fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.x.len(),
                self.x.iter().zip(&self.y).map(|(&x, &y)| y - (p[0] + p[1] * x)),
            )
        }

        fn jacobian(&self, _p: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_fn(self.x.len(), 2, |i, j| if j == 0 { -1.0 } else { -self.x[i] })
        }
    }

    /// `y = a · exp(-k·x)`
    struct Decay {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl Residuals for Decay {
        fn len(&self) -> usize {
            self.x.len()
        }

        fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.x.len(),
                self.x.iter().zip(&self.y).map(|(&x, &y)| y - p[0] * (-p[1] * x).exp()),
            )
        }

        fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_fn(self.x.len(), 2, |i, j| {
                let e = (-p[1] * self.x[i]).exp();
                if j == 0 { -e } else { p[0] * self.x[i] * e }
            })
        }
    }

    #[test]
    fn solves_linear_problem() {
        let line = Line {
            x: vec![0.0, 1.0, 2.0, 3.0],
            y: vec![2.0, 5.0, 8.0, 11.0],
        };
        let out = levenberg_marquardt(&line, &[0.0, 0.0], &SolverOptions::default()).unwrap();
        assert!((out.params[0] - 2.0).abs() < 1e-6);
        assert!((out.params[1] - 3.0).abs() < 1e-6);
        assert!(out.cost < 1e-10);
    }

    #[test]
    fn fits_exponential_decay() {
        let x: Vec<f64> = (0..15).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|&x| 4.0 * (-0.7 * x).exp()).collect();
        let out = levenberg_marquardt(&Decay { x, y }, &[1.0, 0.1], &SolverOptions::default()).unwrap();
        assert!((out.params[0] - 4.0).abs() < 1e-5);
        assert!((out.params[1] - 0.7).abs() < 1e-5);
    }

    #[test]
    fn rejects_underdetermined_problems() {
        let line = Line {
            x: vec![1.0],
            y: vec![1.0],
        };
        let err = levenberg_marquardt(&line, &[0.0, 0.0], &SolverOptions::default()).unwrap_err();
        assert_eq!(
            err,
            LmError::Underdetermined {
                residuals: 1,
                params: 2
            }
        );
    }

    #[test]
    fn rejects_non_finite_start() {
        let line = Line {
            x: vec![0.0, 1.0, 2.0],
            y: vec![1.0, f64::NAN, 3.0],
        };
        let err = levenberg_marquardt(&line, &[0.0, 0.0], &SolverOptions::default()).unwrap_err();
        assert_eq!(err, LmError::NonFiniteStart);
    }
}
