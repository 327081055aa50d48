//! Accelerated projected gradient descent.
//!
//! Projected gradient descent takes a gradient step and projects the result
//! back onto the feasible [`Disk`]. This implementation accelerates it with
//! Nesterov-style extrapolation and guards the extrapolation with a
//! non-monotone line search:
//!
//! * The step size is estimated in every iteration from the two most recent
//!   points and gradients (Barzilai-Borwein secant ratio) and then shrunk by
//!   backtracking.
//! * A candidate is accepted when it decreases a smoothed reference value
//!   `ck` (a weighted running average of accepted objective values) by at
//!   least `delta * || y - z ||^2`. Comparing against `ck` rather than the last
//!   value allows occasional increases of the objective.
//! * If the candidate from the extrapolated point is rejected, a second,
//!   independent backtracking search is run from the last accepted point and
//!   the better of the two candidates is taken.
//! * The process stops when `ck` settles or after the maximum number of
//!   iterations.
//!
//! ```text
//! y_0 = x_0, t_0 = q_0 = 1, c_0 = f(x_0)
//!
//! z = P(y - a_y * grad f(y))                   with backtracking on a_y
//! if c - f(z) >= delta * || y - z ||^2:  x+ = z
//! else:  v = P(x - a_x * grad f(x))            with backtracking on a_x
//!        x+ = argmin { f(z), f(v) }
//!
//! t+ = (1 + sqrt(1 + 4 t^2)) / 2
//! q+ = eta q + 1
//! c+ = (eta q c + f(x+)) / q+
//! y+ = x+ + t / t+ (z - x+) + (t - 1) / t+ (x+ - x)
//! ```
//!
//! # References
//!
//! \[1\] Accelerated Proximal Gradient Methods for Nonconvex Programming (Li &
//! Lin, 2015)
//!
//! \[2\] A Nonmonotone Line Search Technique and Its Application to
//! Unconstrained Optimization (Zhang & Hager, 2004)
//!
//! \[3\] Two-Point Step Size Gradient Methods (Barzilai & Borwein, 1988)

use std::fmt;
use std::time::{Duration, Instant};

use getset::{CopyGetters, Setters};
use log::{debug, warn};
use nalgebra::{
    allocator::Allocator,
    convert,
    storage::{Storage, StorageMut},
    ComplexField, DefaultAllocator, Dim, DimName, OVector, RealField, Vector, U1,
};
use num_traits::Zero;
use thiserror::Error;

use crate::core::{Disk, Evaluator, Problem, ProblemError};

/// Point from which the distance in the sufficient decrease test of the
/// fallback search is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAnchor {
    /// Distance from the extrapolated point `y`, the same point as in the
    /// primary search.
    Momentum,
    /// Distance from the last accepted point `x`, where the fallback search
    /// starts.
    Accepted,
}

impl FallbackAnchor {
    fn select<'a, V>(self, y: &'a V, x: &'a V) -> &'a V {
        match self {
            FallbackAnchor::Momentum => y,
            FallbackAnchor::Accepted => x,
        }
    }
}

/// Options for [`Pgd`] solver.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct PgdOptions<F: Problem> {
    /// Weight of the history in the smoothed reference value. Default: `0.4`.
    eta: F::Scalar,
    /// Coefficient of the sufficient decrease condition. Default: `0.001`.
    delta: F::Scalar,
    /// Factor by which the step size is shrunk in backtracking. Default:
    /// `0.5`.
    rho: F::Scalar,
    /// Maximum number of iterations. Default: `100`.
    max_iters: usize,
    /// Maximum number of rounds of each backtracking search. Default: `10`.
    max_backtracks: usize,
    /// Gradient norm below which backtracking stops after the first round.
    /// Default: `1e-15`.
    grad_tol: F::Scalar,
    /// Threshold for the squared change of the smoothed reference value under
    /// which the process is considered converged. Default: `1e-6`.
    ck_tol: F::Scalar,
    /// Distance reference in the fallback search. Default: momentum (see
    /// [`FallbackAnchor`]).
    fallback_anchor: FallbackAnchor,
}

impl<F: Problem> Default for PgdOptions<F> {
    fn default() -> Self {
        Self {
            eta: convert(0.4),
            delta: convert(0.001),
            rho: convert(0.5),
            max_iters: 100,
            max_backtracks: 10,
            grad_tol: convert(1e-15),
            ck_tol: convert(1e-6),
            fallback_anchor: FallbackAnchor::Momentum,
        }
    }
}

/// Accelerated projected gradient descent solver. See [module](self)
/// documentation for more details.
///
/// The solver holds only its options. All iteration state is created by
/// [`solve`](Pgd::solve) and dropped when it returns, so a single solver can
/// be used for any number of independent solves.
#[derive(Debug, Clone)]
pub struct Pgd<F: Problem> {
    options: PgdOptions<F>,
}

impl<F: Problem> Pgd<F> {
    /// Initializes PGD solver with default options.
    pub fn new(f: &F, disk: &Disk<F::Scalar>) -> Self {
        Self::with_options(f, disk, PgdOptions::default())
    }

    /// Initializes PGD solver with given options.
    ///
    /// The problem and the disk are taken for signature parity only and no
    /// state is sized from them. Their dimensions are checked against the
    /// initial point in [`solve`](Pgd::solve), which reports a mismatch as
    /// [`ProblemError::InvalidDimensionality`].
    pub fn with_options(_f: &F, _disk: &Disk<F::Scalar>, options: PgdOptions<F>) -> Self {
        Self { options }
    }

    /// Gets the options.
    pub fn options(&self) -> &PgdOptions<F> {
        &self.options
    }
}

/// Error returned from [`Pgd`] solver.
#[derive(Debug, Error)]
pub enum PgdError {
    /// Error that occurred when evaluating the problem.
    #[error("{0}")]
    Problem(#[from] ProblemError),
}

/// Reason of stopping the iteration process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The smoothed reference value settled.
    Converged,
    /// Maximum number of iterations was reached.
    MaxIters,
}

/// Which candidate was accepted in an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The candidate from the extrapolated point satisfied the sufficient
    /// decrease condition.
    Extrapolated,
    /// The fallback search ran, but the candidate from the extrapolated point
    /// had lower or equal value.
    ExtrapolatedOverFallback,
    /// The fallback search ran and its candidate had lower value.
    Fallback,
}

/// Current and predecessor points with the cached gradients.
struct IterateState<F: Problem>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    x: OVector<F::Scalar, F::Dim>,
    y: OVector<F::Scalar, F::Dim>,
    x_prev: OVector<F::Scalar, F::Dim>,
    y_prev: OVector<F::Scalar, F::Dim>,
    grad_y: OVector<F::Scalar, F::Dim>,
    grad_y_prev: OVector<F::Scalar, F::Dim>,
    grad_x: OVector<F::Scalar, F::Dim>,
    z: OVector<F::Scalar, F::Dim>,
    v: OVector<F::Scalar, F::Dim>,
    trial: OVector<F::Scalar, F::Dim>,
}

impl<F: Problem> IterateState<F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    fn new(f: &F, x0: OVector<F::Scalar, F::Dim>) -> Self {
        let dim = f.dim();
        let zeros = OVector::zeros_generic(dim, U1::name());

        Self {
            y: x0.clone_owned(),
            x_prev: x0.clone_owned(),
            y_prev: zeros.clone_owned(),
            grad_y: zeros.clone_owned(),
            grad_y_prev: zeros.clone_owned(),
            grad_x: zeros.clone_owned(),
            z: x0.clone_owned(),
            v: x0.clone_owned(),
            trial: zeros,
            x: x0,
        }
    }
}

/// Objective values of the accepted point and of both candidates.
struct ObjectiveTrace<T> {
    fx: T,
    fx_prev: T,
    fz: T,
    fv: T,
}

/// Nesterov parameter and the smoothed reference value with its weight.
#[derive(Debug, Clone, Copy)]
struct SmoothedReference<T> {
    tk: T,
    qk: T,
    ck: T,
}

impl<T: RealField + Copy> SmoothedReference<T> {
    fn new(fx: T) -> Self {
        Self {
            tk: T::one(),
            qk: T::one(),
            ck: fx,
        }
    }

    fn next(&self, eta: T, fx: T) -> Self {
        let one = T::one();
        let two: T = convert(2.0);
        let four: T = convert(4.0);

        let qk = eta * self.qk + one;

        Self {
            tk: (one + (one + four * self.tk * self.tk).sqrt()) / two,
            qk,
            ck: (eta * self.qk * self.ck + fx) / qk,
        }
    }
}

/// Step sizes of both searches in the current iteration.
struct StepSizes<T> {
    alpha_y: T,
    alpha_x: T,
}

/// Outcome of one backtracking search.
struct Backtrack<T> {
    value: T,
    rounds: usize,
    sufficient: bool,
}

/// Solution found by [`Pgd`] solver.
pub struct PgdSolution<F: Problem>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    x: OVector<F::Scalar, F::Dim>,
    fx: F::Scalar,
    iters: usize,
    elapsed: Duration,
    termination: Termination,
}

impl<F: Problem> PgdSolution<F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    /// Returns reference to the last accepted point.
    pub fn x(&self) -> &OVector<F::Scalar, F::Dim> {
        &self.x
    }

    /// Consumes the solution and returns the last accepted point.
    pub fn into_x(self) -> OVector<F::Scalar, F::Dim> {
        self.x
    }

    /// Returns the objective value in the last accepted point.
    pub fn fx(&self) -> F::Scalar {
        self.fx
    }

    /// Returns the number of performed iterations.
    pub fn iters(&self) -> usize {
        self.iters
    }

    /// Returns the wall time of the solve.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the reason of stopping.
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Returns whether the process stopped on the convergence criterion.
    pub fn is_converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

impl<F: Problem> fmt::Debug for PgdSolution<F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgdSolution")
            .field("x", &self.x.as_slice())
            .field("fx", &self.fx)
            .field("iters", &self.iters)
            .field("elapsed", &self.elapsed)
            .field("termination", &self.termination)
            .finish()
    }
}

impl<F: Problem> fmt::Display for PgdSolution<F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iter: {}, objective: {}, x: (", self.iters, self.fx)?;

        for (i, xi) in self.x.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", xi)?;
        }

        write!(f, "), time: {}s", self.elapsed.as_secs_f64())
    }
}

/// State of the current iteration, passed to the callback of
/// [`Pgd::solve_with`] after a candidate is accepted.
pub struct PgdIterState<'a, F: Problem>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    iter: usize,
    x: &'a OVector<F::Scalar, F::Dim>,
    y: &'a OVector<F::Scalar, F::Dim>,
    z: &'a OVector<F::Scalar, F::Dim>,
    v: Option<&'a OVector<F::Scalar, F::Dim>>,
    fx: F::Scalar,
    fx_prev: F::Scalar,
    fz: F::Scalar,
    fv: Option<F::Scalar>,
    ck: F::Scalar,
    ck_plus: F::Scalar,
    tk: F::Scalar,
    step: Step,
    rounds: usize,
    fallback_rounds: usize,
}

impl<'a, F: Problem> PgdIterState<'a, F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    /// Returns the iteration number, starting from 1.
    pub fn iter(&self) -> usize {
        self.iter
    }

    /// Returns the accepted point.
    pub fn x(&self) -> &[F::Scalar] {
        self.x.as_slice()
    }

    /// Returns the extrapolated point of this iteration.
    pub fn y(&self) -> &[F::Scalar] {
        self.y.as_slice()
    }

    /// Returns the candidate from the extrapolated point.
    pub fn z(&self) -> &[F::Scalar] {
        self.z.as_slice()
    }

    /// Returns the candidate of the fallback search, if it ran.
    pub fn v(&self) -> Option<&[F::Scalar]> {
        self.v.map(|v| v.as_slice())
    }

    /// Returns the objective value in the accepted point.
    pub fn fx(&self) -> F::Scalar {
        self.fx
    }

    /// Returns the objective value accepted in the previous iteration.
    pub fn fx_prev(&self) -> F::Scalar {
        self.fx_prev
    }

    /// Returns the objective value of the candidate from the extrapolated
    /// point.
    pub fn fz(&self) -> F::Scalar {
        self.fz
    }

    /// Returns the objective value of the fallback candidate, if the fallback
    /// search ran.
    pub fn fv(&self) -> Option<F::Scalar> {
        self.fv
    }

    /// Returns the smoothed reference value used in this iteration.
    pub fn ck(&self) -> F::Scalar {
        self.ck
    }

    /// Returns the smoothed reference value for the next iteration.
    pub fn ck_plus(&self) -> F::Scalar {
        self.ck_plus
    }

    /// Returns the Nesterov parameter used in this iteration.
    pub fn tk(&self) -> F::Scalar {
        self.tk
    }

    /// Returns which candidate was accepted.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Returns the number of rounds of the primary backtracking search.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns the number of rounds of the fallback backtracking search, zero
    /// if it did not run.
    pub fn fallback_rounds(&self) -> usize {
        self.fallback_rounds
    }
}

impl<F: Evaluator> Pgd<F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    /// Runs the iteration process from `x0` until the convergence criterion
    /// or the iteration cap is reached.
    ///
    /// Reaching the cap is not an error. The only errors are failures of the
    /// evaluations and mismatching dimensions of the problem, the disk and the
    /// initial point.
    pub fn solve(
        &self,
        f: &F,
        disk: &Disk<F::Scalar>,
        x0: OVector<F::Scalar, F::Dim>,
    ) -> Result<PgdSolution<F>, PgdError> {
        self.solve_with(f, disk, x0, |_| {})
    }

    /// Same as [`solve`](Pgd::solve), but calls `inspect` in every iteration
    /// after a candidate is accepted and before the stopping criteria are
    /// checked.
    pub fn solve_with<C>(
        &self,
        f: &F,
        disk: &Disk<F::Scalar>,
        x0: OVector<F::Scalar, F::Dim>,
        mut inspect: C,
    ) -> Result<PgdSolution<F>, PgdError>
    where
        C: FnMut(&PgdIterState<'_, F>),
    {
        let start = Instant::now();

        let dim = f.dim().value();
        if x0.nrows() != dim || disk.dim() != dim {
            return Err(ProblemError::InvalidDimensionality.into());
        }

        let PgdOptions {
            eta,
            max_iters,
            ck_tol,
            fallback_anchor,
            ..
        } = self.options;

        let mut state = IterateState::new(f, x0);

        let fx = f.apply(&state.y)?;
        let mut trace = ObjectiveTrace {
            fx,
            fx_prev: fx,
            fz: fx,
            fv: fx,
        };
        let mut reference = SmoothedReference::new(fx);
        let mut iter = 0;

        let termination = loop {
            iter += 1;
            trace.fx_prev = trace.fx;

            f.gradient(&state.y, &mut state.grad_y)?;

            let mut steps = StepSizes {
                alpha_y: secant_step(&state.y, &state.y_prev, &state.grad_y, &state.grad_y_prev),
                alpha_x: F::Scalar::zero(),
            };

            if !steps.alpha_y.is_finite() {
                warn!(
                    "secant step from the extrapolated point is not finite: {}",
                    steps.alpha_y
                );
            }

            let primary = self.backtrack(
                f,
                disk,
                &state.y,
                &state.grad_y,
                &state.y,
                &mut steps.alpha_y,
                reference.ck,
                &mut state.trial,
                &mut state.z,
            )?;
            trace.fz = primary.value;

            let (step, fallback_rounds) = if primary.sufficient {
                state.x.copy_from(&state.z);
                trace.fx = trace.fz;
                (Step::Extrapolated, 0)
            } else {
                debug!(
                    "extrapolated candidate rejected after {} rounds, searching from the accepted point",
                    primary.rounds
                );

                f.gradient(&state.x, &mut state.grad_x)?;
                steps.alpha_x =
                    secant_step(&state.x, &state.y_prev, &state.grad_x, &state.grad_y_prev);

                if !steps.alpha_x.is_finite() {
                    warn!(
                        "secant step from the accepted point is not finite: {}",
                        steps.alpha_x
                    );
                }

                let anchor = fallback_anchor.select(&state.y, &state.x);

                let fallback = self.backtrack(
                    f,
                    disk,
                    &state.x,
                    &state.grad_x,
                    anchor,
                    &mut steps.alpha_x,
                    reference.ck,
                    &mut state.trial,
                    &mut state.v,
                )?;
                trace.fv = fallback.value;

                if trace.fz <= trace.fv {
                    state.x.copy_from(&state.z);
                    trace.fx = trace.fz;
                    (Step::ExtrapolatedOverFallback, fallback.rounds)
                } else {
                    state.x.copy_from(&state.v);
                    trace.fx = trace.fv;
                    (Step::Fallback, fallback.rounds)
                }
            };

            let next = reference.next(eta, trace.fx);

            debug!(
                "iter = {}\tstep = {:?}\tfx = {}\tck = {} -> {}",
                iter, step, trace.fx, reference.ck, next.ck
            );

            let ran_fallback = step != Step::Extrapolated;
            inspect(&PgdIterState {
                iter,
                x: &state.x,
                y: &state.y,
                z: &state.z,
                v: if ran_fallback { Some(&state.v) } else { None },
                fx: trace.fx,
                fx_prev: trace.fx_prev,
                fz: trace.fz,
                fv: if ran_fallback { Some(trace.fv) } else { None },
                ck: reference.ck,
                ck_plus: next.ck,
                tk: reference.tk,
                step,
                rounds: primary.rounds,
                fallback_rounds,
            });

            let change = next.ck - reference.ck;
            if change * change < ck_tol {
                break Termination::Converged;
            }

            if iter >= max_iters {
                break Termination::MaxIters;
            }

            // Nesterov step. The candidate from the extrapolated point is used
            // even if the fallback candidate was accepted.
            state.y_prev.copy_from(&state.y);
            state.grad_y_prev.copy_from(&state.grad_y);
            momentum_step(
                &mut state.y,
                &state.x,
                &state.x_prev,
                &state.z,
                reference.tk,
                next.tk,
            );
            state.x_prev.copy_from(&state.x);

            reference = next;
        };

        debug!(
            "stopped after {} iterations ({:?}), fx = {}",
            iter, termination, trace.fx
        );

        Ok(PgdSolution {
            x: state.x,
            fx: trace.fx,
            iters: iter,
            elapsed: start.elapsed(),
            termination,
        })
    }

    /// Backtracking search along the projected gradient path from `base`.
    ///
    /// The step size is shrunk after the projection of each round, so the
    /// first round uses the step as given. The last evaluated candidate is
    /// left in `candidate` whatever the outcome.
    #[allow(clippy::too_many_arguments)]
    fn backtrack(
        &self,
        f: &F,
        disk: &Disk<F::Scalar>,
        base: &OVector<F::Scalar, F::Dim>,
        grad: &OVector<F::Scalar, F::Dim>,
        anchor: &OVector<F::Scalar, F::Dim>,
        alpha: &mut F::Scalar,
        ck: F::Scalar,
        trial: &mut OVector<F::Scalar, F::Dim>,
        candidate: &mut OVector<F::Scalar, F::Dim>,
    ) -> Result<Backtrack<F::Scalar>, ProblemError> {
        let PgdOptions {
            delta,
            rho,
            max_backtracks,
            grad_tol,
            ..
        } = self.options;

        let grad_vanished = grad.norm() < grad_tol;
        let mut rounds = 0;

        loop {
            rounds += 1;

            let step = *alpha;
            trial
                .iter_mut()
                .zip(base.iter().zip(grad.iter()))
                .for_each(|(ti, (bi, gi))| *ti = *bi - step * *gi);

            f.project(&*trial, disk, &mut *candidate)?;
            *alpha = step * rho;

            let value = f.apply(&*candidate)?;
            let sufficient = ck - value >= delta * distance_squared(anchor, candidate);

            if sufficient || grad_vanished || rounds >= max_backtracks {
                return Ok(Backtrack {
                    value,
                    rounds,
                    sufficient,
                });
            }
        }
    }
}

/// Computes the Nesterov extrapolation
/// `y = x + tk / tk_plus * (z - x) + (tk - 1) / tk_plus * (x - x_prev)`.
pub fn momentum_step<T, D, Sy, Sx, Sxp, Sz>(
    y: &mut Vector<T, D, Sy>,
    x: &Vector<T, D, Sx>,
    x_prev: &Vector<T, D, Sxp>,
    z: &Vector<T, D, Sz>,
    tk: T,
    tk_plus: T,
) where
    T: RealField + Copy,
    D: Dim,
    Sy: StorageMut<T, D>,
    Sx: Storage<T, D>,
    Sxp: Storage<T, D>,
    Sz: Storage<T, D>,
{
    let one = T::one();

    y.iter_mut()
        .zip(x.iter())
        .zip(x_prev.iter().zip(z.iter()))
        .for_each(|((yi, xi), (xpi, zi))| {
            *yi = *xi + tk / tk_plus * (*zi - *xi) + (tk - one) / tk_plus * (*xi - *xpi);
        });
}

/// Absolute value of the secant ratio `s^T r / r^T r` with `s = x - x_prev`
/// and `r = g - g_prev`.
///
/// Identical gradients give `r = 0` and the ratio is NaN or infinite. The
/// value is returned as is.
fn secant_step<T, D>(
    x: &OVector<T, D>,
    x_prev: &OVector<T, D>,
    g: &OVector<T, D>,
    g_prev: &OVector<T, D>,
) -> T
where
    T: RealField + Copy,
    D: Dim,
    DefaultAllocator: Allocator<T, D>,
{
    let (sr, rr) = x
        .iter()
        .zip(x_prev.iter())
        .zip(g.iter().zip(g_prev.iter()))
        .fold(
            (T::zero(), T::zero()),
            |(sr, rr), ((xi, xpi), (gi, gpi))| {
                let s = *xi - *xpi;
                let r = *gi - *gpi;
                (sr + s * r, rr + r * r)
            },
        );

    (sr / rr).abs()
}

fn distance_squared<T, D>(a: &OVector<T, D>, b: &OVector<T, D>) -> T
where
    T: RealField + Copy,
    D: Dim,
    DefaultAllocator: Allocator<T, D>,
{
    a.iter().zip(b.iter()).fold(T::zero(), |acc, (ai, bi)| {
        let d = *ai - *bi;
        acc + d * d
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::*;

    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::{vector, DimName, IsContiguous, Vector2, U2};
    use rand::{rngs::StdRng, SeedableRng};

    fn solve<F: Evaluator>(
        f: &F,
        disk: &Disk<F::Scalar>,
        x0: OVector<F::Scalar, F::Dim>,
    ) -> PgdSolution<F>
    where
        DefaultAllocator: Allocator<F::Scalar, F::Dim>,
    {
        Pgd::new(f, disk).solve(f, disk, x0).unwrap()
    }

    #[test]
    fn double_well_reference_start() {
        let f = DoubleWell::new();
        let disk = f.disk();

        let solution = solve(&f, &disk, vector![0.2, 1.0]);

        assert!(solution.is_converged());
        assert_eq!(solution.iters(), 9);
        assert_abs_diff_eq!(solution.x()[0], 0.4999465195, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.x()[1], 1.1926871596, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.fx(), 12.8499593229, epsilon = 1e-8);
        assert!(disk.contains(solution.x(), 1e-12));
    }

    #[test]
    fn double_well_far_start() {
        let f = DoubleWell::new();
        let disk = f.disk();

        let solution = solve(&f, &disk, vector![-0.07, -1.45]);

        assert!(solution.is_converged());
        assert_eq!(solution.iters(), 12);
        assert_abs_diff_eq!(solution.x()[0], -0.4970133060, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.x()[1], 1.2545689806, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.fx(), 6.9495629705, epsilon = 1e-8);
    }

    #[test]
    fn far_start_exhausts_both_searches_first() {
        let f = DoubleWell::new();
        let disk = f.disk();
        let pgd = Pgd::new(&f, &disk);

        let mut first = None;
        pgd.solve_with(&f, &disk, vector![-0.07, -1.45], |state| {
            if state.iter() == 1 {
                first = Some((
                    state.step(),
                    state.rounds(),
                    state.fallback_rounds(),
                    state.fz(),
                    state.fv(),
                ));
            }
        })
        .unwrap();

        let (step, rounds, fallback_rounds, fz, fv) = first.unwrap();

        // Both searches start from the same point with the same step, so they
        // tie and the extrapolated candidate is kept.
        assert_eq!(step, Step::ExtrapolatedOverFallback);
        assert_eq!(rounds, 10);
        assert_eq!(fallback_rounds, 10);
        assert_eq!(Some(fz), fv);
    }

    #[test]
    fn fallback_candidate_can_win() {
        let f = Rosenbrock::new();
        let disk = f.disk();
        let pgd = Pgd::new(&f, &disk);

        let mut fallback_steps = 0;
        pgd.solve_with(&f, &disk, vector![-0.5, 0.5], |state| {
            if state.step() == Step::Fallback {
                fallback_steps += 1;
                assert!(state.fv().unwrap() < state.fz());
                assert_eq!(state.x(), state.v().unwrap());
            }
        })
        .unwrap();

        assert!(fallback_steps > 0);
    }

    #[test]
    fn rosenbrock_unit_disk() {
        let f = Rosenbrock::new();
        let disk = f.disk();

        let solution = solve(&f, &disk, vector![-0.5, 0.5]);

        assert!(solution.is_converged());
        assert!(f.is_optimum(solution.x(), 2e-3));
        assert_abs_diff_eq!(solution.fx(), 0.040919, epsilon = 1e-5);

        // Blending the fallback candidate instead of the extrapolated one
        // takes a different path.
        assert_eq!(solution.iters(), 19);
        assert_abs_diff_eq!(solution.x()[0], 0.8077356648, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.x()[1], 0.5895448208, epsilon = 1e-9);
    }

    #[test]
    fn momentum_blend() {
        let mut y = Vector2::zeros();
        momentum_step(
            &mut y,
            &vector![1.0, 1.0],
            &vector![0.0, 0.0],
            &vector![2.0, 2.0],
            2.0,
            3.0,
        );

        assert_relative_eq!(y, vector![2.0, 2.0], epsilon = 1e-12);
    }

    #[test]
    fn smoothed_reference_update() {
        let reference = SmoothedReference::new(10.0);
        let next = reference.next(0.4, 3.0);

        assert_relative_eq!(next.tk, (1.0 + 5f64.sqrt()) / 2.0);
        assert_relative_eq!(next.qk, 1.4);
        assert_relative_eq!(next.ck, (0.4 * 10.0 + 3.0) / 1.4);
    }

    #[test]
    fn secant_step_is_absolute() {
        let s = secant_step(
            &vector![1.0, 0.0],
            &vector![0.0, 0.0],
            &vector![-2.0, 0.0],
            &vector![0.0, 0.0],
        );

        assert_relative_eq!(s, 0.5);
    }

    #[test]
    fn first_trial_uses_unshrunk_step() {
        let f = ShiftedSphere::new();
        let disk = Disk::new(vec![0.0, 0.0], 100.0);
        let pgd = Pgd::new(&f, &disk);

        let mut z = None;
        pgd.solve_with(&f, &disk, vector![0.5, 0.5], |state| {
            if state.iter() == 1 {
                z = Some((state.z().to_vec(), state.rounds()));
            }
        })
        .unwrap();

        // alpha = |s^T r / r^T r| = |-2 / 10| = 0.2 for s = (0.5, 0.5) and
        // r = (-1, -3).
        let (z, rounds) = z.unwrap();
        assert_eq!(rounds, 1);
        assert_relative_eq!(z[0], 0.7, epsilon = 1e-15);
        assert_relative_eq!(z[1], 1.1, epsilon = 1e-15);
    }

    #[test]
    fn descent_bound_and_feasibility() {
        let mut rng = StdRng::seed_from_u64(42);

        let f = DoubleWell::new();
        let disk = f.disk();
        let pgd = Pgd::new(&f, &disk);

        for x0 in f.initials().into_iter().chain(random_initials(&mut rng, 20)) {
            pgd.solve_with(&f, &disk, x0, |state| {
                let eps = 1e-12;

                let z = Vector2::from_column_slice(state.z());
                assert!(disk.contains(&z, eps));
                assert!(disk.contains(&Vector2::from_column_slice(state.x()), eps));

                match state.fv() {
                    Some(fv) => {
                        let v = Vector2::from_column_slice(state.v().unwrap());
                        assert!(disk.contains(&v, eps));
                        assert!(state.fx() <= state.fz().max(fv));
                    }
                    None => {
                        assert_eq!(state.step(), Step::Extrapolated);
                        assert_eq!(state.fx(), state.fz());
                    }
                }
            })
            .unwrap();
        }
    }

    #[test]
    fn terminates_within_max_iters() {
        let mut rng = StdRng::seed_from_u64(7);

        let f = Rosenbrock::new();
        let disk = f.disk();
        let pgd = Pgd::new(&f, &disk);

        for x0 in random_initials(&mut rng, 50) {
            let solution = pgd.solve(&f, &disk, x0).unwrap();
            assert!(solution.iters() <= 100);
        }
    }

    #[test]
    fn max_iters_cap() {
        let f = DoubleWell::new();
        let disk = f.disk();

        let mut options = PgdOptions::default();
        options.set_max_iters(3);
        let pgd = Pgd::with_options(&f, &disk, options);

        let solution = pgd.solve(&f, &disk, vector![0.2, 1.0]).unwrap();

        assert_eq!(solution.iters(), 3);
        assert_eq!(solution.termination(), Termination::MaxIters);
    }

    #[test]
    fn repeated_solves_are_identical() {
        let f = DoubleWell::new();
        let disk = f.disk();
        let pgd = Pgd::new(&f, &disk);

        for x0 in f.initials() {
            let first = pgd.solve(&f, &disk, x0.clone_owned()).unwrap();
            let second = pgd.solve(&f, &disk, x0).unwrap();

            assert_eq!(first.iters(), second.iters());
            assert_eq!(first.fx().to_bits(), second.fx().to_bits());
            assert_eq!(first.x()[0].to_bits(), second.x()[0].to_bits());
            assert_eq!(first.x()[1].to_bits(), second.x()[1].to_bits());
        }
    }

    #[test]
    fn fallback_anchor_accepted() {
        let f = DoubleWell::new();
        let disk = f.disk();

        let mut options = PgdOptions::default();
        options.set_fallback_anchor(FallbackAnchor::Accepted);
        let pgd = Pgd::with_options(&f, &disk, options);

        let solution = pgd.solve(&f, &disk, vector![-0.07, -1.45]).unwrap();

        assert!(solution.is_converged());
        assert_abs_diff_eq!(solution.x()[0], -0.4970133060, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.x()[1], 1.2545689806, epsilon = 1e-6);
    }

    #[test]
    fn fallback_anchor_selects_point() {
        let y = vector![10.0, 10.0];
        let x = vector![0.0, 0.0];

        assert_eq!(FallbackAnchor::Momentum.select(&y, &x), &y);
        assert_eq!(FallbackAnchor::Accepted.select(&y, &x), &x);
    }

    #[test]
    fn fallback_distance_from_anchor() {
        let f = ShiftedSphere::new();
        let disk = Disk::new(vec![0.0, 0.0], 100.0);
        let pgd = Pgd::new(&f, &disk);

        // Fallback search from x = (0, 0) after extrapolating to y = (10, 10).
        // The first trial is (0.5, 1) with value 1.25, so ck - f = 0.01.
        let x = vector![0.0, 0.0];
        let y = vector![10.0, 10.0];
        let grad = vector![-2.0, -4.0];

        let search = |anchor: FallbackAnchor| {
            let mut alpha = 0.25;
            let mut trial = Vector2::zeros();
            let mut candidate = Vector2::zeros();

            let result = pgd
                .backtrack(
                    &f,
                    &disk,
                    &x,
                    &grad,
                    anchor.select(&y, &x),
                    &mut alpha,
                    1.26,
                    &mut trial,
                    &mut candidate,
                )
                .unwrap();

            (result, alpha, candidate)
        };

        // delta * ||x - v||^2 = 0.00125 accepts the first trial.
        let (accepted, alpha, candidate) = search(FallbackAnchor::Accepted);
        assert!(accepted.sufficient);
        assert_eq!(accepted.rounds, 1);
        assert_eq!(accepted.value, 1.25);
        assert_eq!(alpha, 0.125);
        assert_eq!(candidate, vector![0.5, 1.0]);

        // delta * ||y - v||^2 = 0.17125 rejects it and shorter steps only
        // increase the value.
        let (momentum, alpha, _) = search(FallbackAnchor::Momentum);
        assert!(!momentum.sufficient);
        assert_eq!(momentum.rounds, 10);
        assert_relative_eq!(alpha, 0.25 * 0.5f64.powi(10));
    }

    #[test]
    fn degenerate_secant_propagates() {
        // Constant gradient makes r = 0 in the second iteration and the step
        // estimate 0 / 0.
        let f = Linear::new();
        let disk = f.disk();
        let pgd = Pgd::new(&f, &disk);

        let mut first_nan = None;
        let solution = pgd
            .solve_with(&f, &disk, vector![0.2, 1.0], |state| {
                if first_nan.is_none() && state.fx().is_nan() {
                    first_nan = Some(state.iter());
                }
            })
            .unwrap();

        assert_eq!(first_nan, Some(2));
        assert!(solution.fx().is_nan());
        assert_eq!(solution.iters(), 100);
        assert_eq!(solution.termination(), Termination::MaxIters);
    }

    #[test]
    fn zero_secant_at_origin() {
        // Zero-initialized previous point makes s = 0 when starting at the
        // origin, so the step is zero and the start is accepted unchanged.
        let f = Rosenbrock::new();
        let disk = f.disk();

        let solution = solve(&f, &disk, vector![0.0, 0.0]);

        assert!(solution.is_converged());
        assert_eq!(solution.iters(), 1);
        assert_eq!(solution.x(), &vector![0.0, 0.0]);
        assert_eq!(solution.fx(), 1.0);
    }

    struct Constant;

    impl Problem for Constant {
        type Scalar = f64;
        type Dim = U2;

        fn dim(&self) -> Self::Dim {
            U2::name()
        }
    }

    impl crate::core::Function for Constant {
        fn apply<Sx>(&self, _x: &Vector<f64, U2, Sx>) -> Result<f64, ProblemError>
        where
            Sx: Storage<f64, U2> + IsContiguous,
        {
            Ok(3.0)
        }
    }

    impl Evaluator for Constant {
        fn gradient<Sx, Sg>(
            &self,
            _x: &Vector<f64, U2, Sx>,
            grad: &mut Vector<f64, U2, Sg>,
        ) -> Result<(), ProblemError>
        where
            Sx: Storage<f64, U2> + IsContiguous,
            Sg: StorageMut<f64, U2> + IsContiguous,
        {
            grad.fill(0.0);
            Ok(())
        }
    }

    #[test]
    fn vanished_gradient_stops_backtracking() {
        let f = Constant;
        let disk = Disk::unit(2);
        let pgd = Pgd::new(&f, &disk);

        // Both searches stop after the first round. The step estimate is 0 / 0
        // here, but the constant objective keeps ck unchanged.
        let mut rounds = Vec::new();
        let solution = pgd
            .solve_with(&f, &disk, vector![0.1, 0.2], |state| {
                rounds.push((state.rounds(), state.fallback_rounds()));
            })
            .unwrap();

        assert_eq!(rounds, vec![(1, 1)]);
        assert_eq!(solution.iters(), 1);
        assert!(solution.is_converged());
    }

    #[test]
    fn invalid_dimensionality() {
        let f = DoubleWell::new();
        let disk = Disk::unit(3);

        let result = Pgd::new(&f, &disk).solve(&f, &disk, vector![0.2, 1.0]);

        assert!(matches!(
            result,
            Err(PgdError::Problem(ProblemError::InvalidDimensionality))
        ));
    }

    #[test]
    fn display() {
        let f = DoubleWell::new();
        let disk = f.disk();

        let solution = solve(&f, &disk, vector![0.2, 1.0]);
        let line = solution.to_string();

        assert!(line.starts_with("iter: 9, objective: 12.84995"));
        assert!(line.contains("x: (0.49994"));
        assert!(line.ends_with('s'));
    }
}
