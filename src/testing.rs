//! Testing problems and utilities useful for benchmarking, debugging and smoke
//! testing.
//!
//! [`DoubleWell`] is the reference problem with two local minima on the
//! boundary of its disk. [`ShiftedSphere`] and [`Rosenbrock`] are convex and
//! nonconvex problems on the unit disk, and [`Linear`] makes the secant step
//! estimate degenerate. The `double_well_*` functions implement the reference
//! problem in the calling convention of generated code (see
//! [`compiled`](crate::compiled)).
//!
//! # References
//!
//! \[1\] [A Literature Survey of Benchmark Functions For Global Optimization
//! Problems](https://arxiv.org/abs/1308.4008)

#![allow(unused)]

use nalgebra::{
    allocator::Allocator,
    storage::{Storage, StorageMut},
    vector, ComplexField, DefaultAllocator, DimName, IsContiguous, OVector, Vector, Vector2, U2,
};
use num_traits::Zero;
use rand::Rng;

use crate::compiled::{Compiled, GeneratedFunction, WorkSize};
use crate::core::{Disk, Evaluator, Function, Problem, ProblemError};

/// Extension of the [`Evaluator`] trait that provides additional information
/// that is useful for testing solvers.
pub trait TestProblem: Evaluator
where
    DefaultAllocator: Allocator<Self::Scalar, Self::Dim>,
{
    /// The feasible disk of the problem.
    fn disk(&self) -> Disk<Self::Scalar>;

    /// Standard initial values for the problem. Using the same initial values is
    /// essential for fair comparison of methods.
    fn initials(&self) -> Vec<OVector<Self::Scalar, Self::Dim>>;

    /// A set of local minima in the disk (if known). For testing if a given
    /// point is a minimum, [`TestProblem::is_optimum`] should be used.
    fn optima(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        Vec::new()
    }

    /// Test if given point is within the distance `eps` from one of the
    /// known minima.
    fn is_optimum<Sx>(&self, x: &Vector<Self::Scalar, Self::Dim, Sx>, eps: Self::Scalar) -> bool
    where
        Sx: Storage<Self::Scalar, Self::Dim>,
    {
        self.optima().iter().any(|optimum| {
            let dist = optimum
                .iter()
                .zip(x.iter())
                .fold(Self::Scalar::zero(), |acc, (oi, xi)| {
                    let d = *oi - *xi;
                    acc + d * d
                })
                .sqrt();

            dist <= eps
        })
    }
}

/// Samples `n` points uniformly in the square `[-2, 2]^2`.
pub fn random_initials<R: Rng>(rng: &mut R, n: usize) -> Vec<Vector2<f64>> {
    (0..n)
        .map(|_| vector![rng.gen_range(-2.0..=2.0), rng.gen_range(-2.0..=2.0)])
        .collect()
}

/// Double-well function
///
/// ```text
/// f(x) = 15 (x1^2 - 1)^2 + (x2^2 - 2)^2 + 4 x1 x2 + x1 + x2
/// ```
///
/// on the disk centered at `(0, 1.2)` with radius `0.5`.
///
/// Both minima in the disk lie on its boundary. The one around `(0.5, 1.19)`
/// is reached from the standard initial point `(0.2, 1.0)`, the lower one
/// around `(-0.5, 1.25)` from `(-0.07, -1.45)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleWell(());

impl DoubleWell {
    /// Initializes the problem.
    pub fn new() -> Self {
        Self(())
    }
}

impl Problem for DoubleWell {
    type Scalar = f64;
    type Dim = U2;

    fn dim(&self) -> Self::Dim {
        U2::name()
    }
}

impl Function for DoubleWell {
    fn apply<Sx>(&self, x: &Vector<Self::Scalar, Self::Dim, Sx>) -> Result<Self::Scalar, ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
    {
        let (x1, x2) = (x[0], x[1]);
        Ok(15.0 * (x1 * x1 - 1.0).powi(2) + (x2 * x2 - 2.0).powi(2) + 4.0 * x1 * x2 + x1 + x2)
    }
}

impl Evaluator for DoubleWell {
    fn gradient<Sx, Sg>(
        &self,
        x: &Vector<Self::Scalar, Self::Dim, Sx>,
        grad: &mut Vector<Self::Scalar, Self::Dim, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Sg: StorageMut<Self::Scalar, Self::Dim> + IsContiguous,
    {
        let (x1, x2) = (x[0], x[1]);
        grad[0] = 60.0 * x1 * (x1 * x1 - 1.0) + 4.0 * x2 + 1.0;
        grad[1] = 4.0 * x2 * (x2 * x2 - 2.0) + 4.0 * x1 + 1.0;
        Ok(())
    }
}

impl TestProblem for DoubleWell {
    fn disk(&self) -> Disk<Self::Scalar> {
        Disk::new(vec![0.0, 1.2], 0.5)
    }

    fn initials(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        vec![vector![0.2, 1.0], vector![-0.07, -1.45]]
    }

    fn optima(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        vec![
            vector![0.4999465194, 1.1926871509],
            vector![-0.4970133064, 1.2545689770],
        ]
    }
}

/// Sphere function shifted to `(1, 2)`, on the unit disk.
///
/// The unconstrained minimum lies outside of the disk, the constrained one is
/// its projection `(1, 2) / sqrt(5)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftedSphere(());

impl ShiftedSphere {
    /// Initializes the problem.
    pub fn new() -> Self {
        Self(())
    }
}

impl Problem for ShiftedSphere {
    type Scalar = f64;
    type Dim = U2;

    fn dim(&self) -> Self::Dim {
        U2::name()
    }
}

impl Function for ShiftedSphere {
    fn apply<Sx>(&self, x: &Vector<Self::Scalar, Self::Dim, Sx>) -> Result<Self::Scalar, ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
    {
        Ok((x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2))
    }
}

impl Evaluator for ShiftedSphere {
    fn gradient<Sx, Sg>(
        &self,
        x: &Vector<Self::Scalar, Self::Dim, Sx>,
        grad: &mut Vector<Self::Scalar, Self::Dim, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Sg: StorageMut<Self::Scalar, Self::Dim> + IsContiguous,
    {
        grad[0] = 2.0 * (x[0] - 1.0);
        grad[1] = 2.0 * (x[1] - 2.0);
        Ok(())
    }
}

impl TestProblem for ShiftedSphere {
    fn disk(&self) -> Disk<Self::Scalar> {
        Disk::unit(2)
    }

    fn initials(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        vec![vector![0.5, 0.5], vector![-0.5, -0.5]]
    }

    fn optima(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        let norm = 5f64.sqrt();
        vec![vector![1.0 / norm, 2.0 / norm]]
    }
}

/// [Rosenbrock function](https://en.wikipedia.org/wiki/Rosenbrock_function)
/// \[1\]
///
/// ```text
/// f(x) = (1 - x1)^2 + (x2 - x1^2)^2
/// ```
///
/// on the unit disk. The unconstrained minimum `(1, 1)` lies outside, the
/// constrained one is on the boundary inside the curved valley.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rosenbrock(());

impl Rosenbrock {
    /// Initializes the problem.
    pub fn new() -> Self {
        Self(())
    }
}

impl Problem for Rosenbrock {
    type Scalar = f64;
    type Dim = U2;

    fn dim(&self) -> Self::Dim {
        U2::name()
    }
}

impl Function for Rosenbrock {
    fn apply<Sx>(&self, x: &Vector<Self::Scalar, Self::Dim, Sx>) -> Result<Self::Scalar, ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
    {
        Ok((1.0 - x[0]).powi(2) + (x[1] - x[0] * x[0]).powi(2))
    }
}

impl Evaluator for Rosenbrock {
    fn gradient<Sx, Sg>(
        &self,
        x: &Vector<Self::Scalar, Self::Dim, Sx>,
        grad: &mut Vector<Self::Scalar, Self::Dim, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Sg: StorageMut<Self::Scalar, Self::Dim> + IsContiguous,
    {
        let valley = x[1] - x[0] * x[0];
        grad[0] = -2.0 * (1.0 - x[0]) - 4.0 * x[0] * valley;
        grad[1] = 2.0 * valley;
        Ok(())
    }
}

impl TestProblem for Rosenbrock {
    fn disk(&self) -> Disk<Self::Scalar> {
        Disk::unit(2)
    }

    fn initials(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        vec![vector![-0.5, 0.5], vector![0.0, 0.0]]
    }

    fn optima(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        vec![vector![0.8081695847, 0.5889498470]]
    }
}

/// Linear function `f(x) = x1 + x2` on the double-well disk.
///
/// The gradient is constant, so the secant step estimate divides zero by zero
/// from the second iteration on. Useful for checking that such degeneracy
/// does not break the solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear(());

impl Linear {
    /// Initializes the problem.
    pub fn new() -> Self {
        Self(())
    }
}

impl Problem for Linear {
    type Scalar = f64;
    type Dim = U2;

    fn dim(&self) -> Self::Dim {
        U2::name()
    }
}

impl Function for Linear {
    fn apply<Sx>(&self, x: &Vector<Self::Scalar, Self::Dim, Sx>) -> Result<Self::Scalar, ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
    {
        Ok(x[0] + x[1])
    }
}

impl Evaluator for Linear {
    fn gradient<Sx, Sg>(
        &self,
        _x: &Vector<Self::Scalar, Self::Dim, Sx>,
        grad: &mut Vector<Self::Scalar, Self::Dim, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Sg: StorageMut<Self::Scalar, Self::Dim> + IsContiguous,
    {
        grad.fill(1.0);
        Ok(())
    }
}

impl TestProblem for Linear {
    fn disk(&self) -> Disk<Self::Scalar> {
        Disk::new(vec![0.0, 1.2], 0.5)
    }

    fn initials(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        vec![vector![0.2, 1.0]]
    }

    fn optima(&self) -> Vec<OVector<Self::Scalar, Self::Dim>> {
        let offset = 0.5 / 2f64.sqrt();
        vec![vector![-offset, 1.2 - offset]]
    }
}

/// Objective of [`DoubleWell`] in generated calling convention.
pub fn double_well_objective(arg: &[&[f64]], res: &mut [&mut [f64]], _iw: &mut [i64], w: &mut [f64]) -> i32 {
    if arg[0].len() < 2 || res[0].is_empty() {
        return 1;
    }

    let (x1, x2) = (arg[0][0], arg[0][1]);
    w[0] = x1 * x1 - 1.0;
    w[1] = x2 * x2 - 2.0;

    res[0][0] = 15.0 * w[0] * w[0] + w[1] * w[1] + 4.0 * x1 * x2 + x1 + x2;
    0
}

/// Work size of [`double_well_objective`].
pub fn double_well_objective_work() -> WorkSize {
    WorkSize::new(1, 1, 0, 2)
}

/// Gradient of [`DoubleWell`] in generated calling convention.
pub fn double_well_gradient(arg: &[&[f64]], res: &mut [&mut [f64]], _iw: &mut [i64], _w: &mut [f64]) -> i32 {
    if arg[0].len() < 2 || res[0].len() < 2 {
        return 1;
    }

    let (x1, x2) = (arg[0][0], arg[0][1]);
    res[0][0] = 60.0 * x1 * (x1 * x1 - 1.0) + 4.0 * x2 + 1.0;
    res[0][1] = 4.0 * x2 * (x2 * x2 - 2.0) + 4.0 * x1 + 1.0;
    0
}

/// Work size of [`double_well_gradient`].
pub fn double_well_gradient_work() -> WorkSize {
    WorkSize::new(1, 1, 0, 0)
}

/// Euclidean projection onto a disk in generated calling convention, with
/// arguments `[x, center, [radius]]`.
pub fn double_well_projection(arg: &[&[f64]], res: &mut [&mut [f64]], _iw: &mut [i64], w: &mut [f64]) -> i32 {
    let n = arg[0].len();
    if arg[1].len() != n || arg[2].is_empty() || res[0].len() != n {
        return 1;
    }

    let radius = arg[2][0];

    // w[0] holds the squared distance.
    w[0] = 0.0;
    for i in 0..n {
        let d = arg[0][i] - arg[1][i];
        w[0] += d * d;
    }
    let dist = w[0].sqrt();

    for i in 0..n {
        res[0][i] = if dist > radius {
            arg[1][i] + radius * (arg[0][i] - arg[1][i]) / dist
        } else {
            arg[0][i]
        };
    }

    0
}

/// Work size of [`double_well_projection`].
pub fn double_well_projection_work() -> WorkSize {
    WorkSize::new(3, 1, 0, 1)
}

/// [`DoubleWell`] problem backed by the functions in generated calling
/// convention.
pub fn double_well_compiled() -> Compiled {
    Compiled::new(
        2,
        GeneratedFunction::new("double_well_objective", double_well_objective, double_well_objective_work),
        GeneratedFunction::new("double_well_gradient", double_well_gradient, double_well_gradient_work),
        GeneratedFunction::new(
            "double_well_projection",
            double_well_projection,
            double_well_projection_work,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn double_well_optima_are_feasible() {
        let f = DoubleWell::new();
        let disk = f.disk();

        for optimum in f.optima() {
            assert!(disk.contains(&optimum, 1e-9));
            assert!(f.is_optimum(&optimum, 1e-12));
        }
    }

    #[test]
    fn rosenbrock_gradient_vanishes_at_unconstrained_minimum() {
        let f = Rosenbrock::new();
        let mut grad = Vector2::zeros();

        f.gradient(&vector![1.0, 1.0], &mut grad).unwrap();

        assert_abs_diff_eq!(grad, Vector2::zeros());
        assert_eq!(f.apply(&vector![1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn generated_projection_argument_mismatch() {
        let mut out = [0.0, 0.0];
        let args: [&[f64]; 3] = [&[0.0, 0.0], &[0.0], &[1.0]];

        let status = double_well_projection(&args, &mut [&mut out[..]], &mut [], &mut [0.0]);

        assert_eq!(status, 1);
    }
}
