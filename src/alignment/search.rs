//! Bracketing root search for one-dimensional alignment objectives

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alignment::Evaluation;
use crate::error::{AlignmentError, Result};

/// Bracket and stopping rule for [`RootSearch`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchParams {
    /// Initial lower end of the bracket
    pub lower: f64,
    /// Initial upper end of the bracket
    pub upper: f64,
    /// Stop once |f(x)| falls to this value
    pub tolerance: f64,
    /// Stop once the bracket is narrower than this
    pub x_tolerance: f64,
    /// Maximum bisection steps
    pub max_iterations: usize,
    /// How many times the bracket may be widened to find a sign change
    pub max_expansions: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            lower: -2.0,
            upper: 2.0,
            tolerance: 5e-4,
            x_tolerance: 1e-6,
            max_iterations: 60,
            max_expansions: 4,
        }
    }
}

/// Result of a root search
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Best argument found
    pub root: f64,
    /// Objective value at `root`
    pub error: f64,
    /// Bisection steps taken
    pub iterations: usize,
    /// Total objective evaluations, bracketing included
    pub evaluations: usize,
    pub converged: bool,
}

/// Bisection with bracket expansion.
///
/// Needs only the sign of the objective, which suits alignment errors that
/// move in steps as individual matches switch on and off.
#[derive(Clone, Debug, Default)]
pub struct RootSearch {
    pub params: SearchParams,
}

struct Tally<'e, E: ?Sized> {
    objective: &'e mut E,
    evaluations: usize,
    best: (f64, f64),
}

impl<'e, E: Evaluation + ?Sized> Tally<'e, E> {
    fn eval(&mut self, x: f64) -> Result<f64> {
        let fx = self.objective.evaluate(x)?;
        self.evaluations += 1;
        if fx.abs() < self.best.1.abs() {
            self.best = (x, fx);
        }
        Ok(fx)
    }
}

impl RootSearch {
    pub fn new(params: SearchParams) -> Self {
        RootSearch { params }
    }

    /// Find `x` with `objective(x)` close to zero.
    ///
    /// The objective is left evaluated at whichever point it saw last,
    /// which is not necessarily the returned root.
    pub fn solve<E: Evaluation + ?Sized>(&self, objective: &mut E) -> Result<SearchOutcome> {
        let p = &self.params;
        let (lo, hi) = if p.lower <= p.upper {
            (p.lower, p.upper)
        } else {
            (p.upper, p.lower)
        };

        let mut tally = Tally {
            objective,
            evaluations: 0,
            best: (lo, f64::INFINITY),
        };

        let (mut lo, mut hi, mut f_lo) = self.bracket(&mut tally, lo, hi)?;

        let mut iterations = 0;
        let mut converged = tally.best.1.abs() <= p.tolerance;
        let mut answer = tally.best;

        while !converged && iterations < p.max_iterations {
            let mid = 0.5 * (lo + hi);
            let f_mid = tally.eval(mid)?;
            iterations += 1;

            if f_mid.abs() <= p.tolerance || 0.5 * (hi - lo) < p.x_tolerance {
                // A step-shaped objective may never reach the tolerance; the
                // sign change is then pinned to the bracket midpoint.
                converged = true;
                answer = (mid, f_mid);
            } else if same_sign(f_mid, f_lo) {
                lo = mid;
                f_lo = f_mid;
            } else {
                hi = mid;
            }
        }

        if !converged {
            answer = tally.best;
        }
        let (root, error) = answer;
        let outcome = SearchOutcome {
            root,
            error,
            iterations,
            evaluations: tally.evaluations,
            converged,
        };

        if converged {
            info!(root, error, iterations, "root search converged");
        } else {
            warn!(root, error, iterations, "root search stopped before reaching tolerance");
        }
        Ok(outcome)
    }

    /// Widen `[lo, hi]` until the objective changes sign or is already within
    /// tolerance at an end. Returns the bracket and the objective at `lo`;
    /// bisection only compares against the lower end.
    fn bracket<E: Evaluation + ?Sized>(
        &self,
        tally: &mut Tally<'_, E>,
        mut lo: f64,
        mut hi: f64,
    ) -> Result<(f64, f64, f64)> {
        let p = &self.params;
        let mut f_lo = tally.eval(lo)?;
        let mut f_hi = tally.eval(hi)?;
        let mut expansions = 0;

        while f_lo.abs() > p.tolerance && f_hi.abs() > p.tolerance && same_sign(f_lo, f_hi) {
            if expansions == p.max_expansions {
                return Err(AlignmentError::NotBracketed {
                    lower: lo,
                    upper: hi,
                    f_lower: f_lo,
                    f_upper: f_hi,
                });
            }
            let width = (hi - lo).max(p.x_tolerance);
            lo -= width;
            hi += width;
            f_lo = tally.eval(lo)?;
            f_hi = tally.eval(hi)?;
            expansions += 1;
            debug!(lo, hi, f_lo, f_hi, "widened search bracket");
        }
        Ok((lo, hi, f_lo))
    }
}

fn same_sign(a: f64, b: f64) -> bool {
    (a > 0.0 && b > 0.0) || (a < 0.0 && b < 0.0)
}
