//! Adapter for ahead-of-time generated functions.
//!
//! Code generators for numerical optimization emit plain functions with a
//! fixed calling convention: the inputs are a list of argument slices, the
//! outputs a list of result slices, and the caller supplies integer and real
//! work arrays whose sizes are reported by a companion query function. A
//! non-zero return value signals a failure.
//!
//! [`GeneratedFunction`] wraps one such function together with its work size
//! query and [`Compiled`] combines three of them (objective, gradient and
//! projection) into an [`Evaluator`].
//!
//! ```rust
//! use apgd::compiled::{GeneratedFunction, WorkSize};
//!
//! fn norm2(arg: &[&[f64]], res: &mut [&mut [f64]], _iw: &mut [i64], _w: &mut [f64]) -> i32 {
//!     res[0][0] = arg[0].iter().map(|xi| xi * xi).sum();
//!     0
//! }
//!
//! fn norm2_work() -> WorkSize {
//!     WorkSize::new(1, 1, 0, 0)
//! }
//!
//! let f = GeneratedFunction::new("norm2", norm2, norm2_work);
//!
//! let mut out = [0.0];
//! f.call(&[&[3.0, 4.0]], &mut [&mut out[..]]).unwrap();
//! assert_eq!(out[0], 25.0);
//! ```

use std::fmt;

use nalgebra::{
    storage::{Storage, StorageMut},
    Dynamic, IsContiguous, Vector,
};

use crate::core::{Disk, Evaluator, Function, Problem, ProblemError};

/// Numbers of arguments, results and work array lengths of a generated
/// function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSize {
    /// Number of arguments.
    pub n_arg: usize,
    /// Number of results.
    pub n_res: usize,
    /// Length of the integer work array.
    pub n_iw: usize,
    /// Length of the real work array.
    pub n_w: usize,
}

impl WorkSize {
    /// Creates the work size.
    pub fn new(n_arg: usize, n_res: usize, n_iw: usize, n_w: usize) -> Self {
        Self {
            n_arg,
            n_res,
            n_iw,
            n_w,
        }
    }
}

/// Signature of a generated function.
pub type EvalFn = fn(&[&[f64]], &mut [&mut [f64]], &mut [i64], &mut [f64]) -> i32;

/// Signature of the work size query of a generated function.
pub type WorkFn = fn() -> WorkSize;

/// Generated function with its work size query.
#[derive(Clone, Copy)]
pub struct GeneratedFunction {
    name: &'static str,
    eval: EvalFn,
    work: WorkFn,
}

impl GeneratedFunction {
    /// Wraps given generated function. The name is used in error reporting.
    pub fn new(name: &'static str, eval: EvalFn, work: WorkFn) -> Self {
        Self { name, eval, work }
    }

    /// Gets the name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queries the work size.
    pub fn work(&self) -> WorkSize {
        (self.work)()
    }

    /// Calls the function. Work arrays are allocated for each call.
    pub fn call(&self, arg: &[&[f64]], res: &mut [&mut [f64]]) -> Result<(), ProblemError> {
        let work = self.work();

        if arg.len() < work.n_arg {
            return Err(ProblemError::InvalidArguments {
                name: self.name,
                expected: work.n_arg,
                got: arg.len(),
            });
        }

        if res.len() < work.n_res {
            return Err(ProblemError::InvalidArguments {
                name: self.name,
                expected: work.n_res,
                got: res.len(),
            });
        }

        let mut iw = vec![0; work.n_iw];
        let mut w = vec![0.0; work.n_w];

        match (self.eval)(arg, res, &mut iw, &mut w) {
            0 => Ok(()),
            status => Err(ProblemError::Generated {
                name: self.name,
                status,
            }),
        }
    }
}

impl fmt::Debug for GeneratedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedFunction")
            .field("name", &self.name)
            .field("work", &self.work())
            .finish()
    }
}

/// Evaluator backed by generated functions.
///
/// The functions are called with these arguments and results:
///
/// * objective: `[x]` -> `[f]` with `f` of length 1,
/// * gradient: `[x]` -> `[grad]`,
/// * projection: `[x, center, [radius]]` -> `[px]`.
#[derive(Debug, Clone, Copy)]
pub struct Compiled {
    dim: usize,
    objective: GeneratedFunction,
    gradient: GeneratedFunction,
    projection: GeneratedFunction,
}

impl Compiled {
    /// Creates the evaluator for a problem of given dimension.
    pub fn new(
        dim: usize,
        objective: GeneratedFunction,
        gradient: GeneratedFunction,
        projection: GeneratedFunction,
    ) -> Self {
        assert!(dim > 0, "dim must be greater than zero");

        Self {
            dim,
            objective,
            gradient,
            projection,
        }
    }

    fn check_dim(&self, n: usize) -> Result<(), ProblemError> {
        if n == self.dim {
            Ok(())
        } else {
            Err(ProblemError::InvalidDimensionality)
        }
    }
}

impl Problem for Compiled {
    type Scalar = f64;
    type Dim = Dynamic;

    fn dim(&self) -> Self::Dim {
        Dynamic::new(self.dim)
    }
}

impl Function for Compiled {
    fn apply<Sx>(&self, x: &Vector<Self::Scalar, Self::Dim, Sx>) -> Result<Self::Scalar, ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
    {
        self.check_dim(x.nrows())?;

        let mut fx = [0.0];
        self.objective.call(&[x.as_slice()], &mut [&mut fx[..]])?;
        Ok(fx[0])
    }
}

impl Evaluator for Compiled {
    fn gradient<Sx, Sg>(
        &self,
        x: &Vector<Self::Scalar, Self::Dim, Sx>,
        grad: &mut Vector<Self::Scalar, Self::Dim, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Sg: StorageMut<Self::Scalar, Self::Dim> + IsContiguous,
    {
        self.check_dim(x.nrows())?;
        self.check_dim(grad.nrows())?;

        self.gradient.call(&[x.as_slice()], &mut [grad.as_mut_slice()])
    }

    fn project<Sx, Spx>(
        &self,
        x: &Vector<Self::Scalar, Self::Dim, Sx>,
        disk: &Disk<Self::Scalar>,
        px: &mut Vector<Self::Scalar, Self::Dim, Spx>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Spx: StorageMut<Self::Scalar, Self::Dim> + IsContiguous,
    {
        self.check_dim(x.nrows())?;
        self.check_dim(px.nrows())?;
        self.check_dim(disk.dim())?;

        let radius = [disk.radius()];
        let args: [&[f64]; 3] = [x.as_slice(), disk.center().as_slice(), &radius];

        self.projection.call(&args, &mut [px.as_mut_slice()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::solver::Pgd;
    use crate::testing::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dvector, vector, DVector, Vector2};

    fn failing(_arg: &[&[f64]], _res: &mut [&mut [f64]], _iw: &mut [i64], _w: &mut [f64]) -> i32 {
        3
    }

    fn failing_work() -> WorkSize {
        WorkSize::new(1, 1, 0, 0)
    }

    #[test]
    fn matches_closed_form() {
        let f = DoubleWell::new();
        let compiled = double_well_compiled();
        let disk = f.disk();

        let mut grad = Vector2::zeros();
        let mut grad_compiled = DVector::zeros(2);
        let mut px = DVector::zeros(2);

        for (x1, x2) in [(0.2, 1.0), (-0.07, -1.45), (1.3, -0.4)] {
            let x = vector![x1, x2];
            let xd = dvector![x1, x2];

            assert_abs_diff_eq!(compiled.apply(&xd).unwrap(), f.apply(&x).unwrap(), epsilon = 1e-12);

            f.gradient(&x, &mut grad).unwrap();
            compiled.gradient(&xd, &mut grad_compiled).unwrap();
            assert_abs_diff_eq!(grad_compiled[0], grad[0], epsilon = 1e-12);
            assert_abs_diff_eq!(grad_compiled[1], grad[1], epsilon = 1e-12);

            let mut px_closed = x;
            disk.project(&mut px_closed);
            compiled.project(&xd, &disk, &mut px).unwrap();
            assert_abs_diff_eq!(px[0], px_closed[0], epsilon = 1e-12);
            assert_abs_diff_eq!(px[1], px_closed[1], epsilon = 1e-12);
        }
    }

    #[test]
    fn same_trajectory_as_closed_form() {
        let f = DoubleWell::new();
        let compiled = double_well_compiled();
        let disk = f.disk();

        let mut expected = Vec::new();
        Pgd::new(&f, &disk)
            .solve_with(&f, &disk, vector![0.2, 1.0], |state| {
                expected.push((state.x().to_vec(), state.fx()));
            })
            .unwrap();

        let mut actual = Vec::new();
        let solution = Pgd::new(&compiled, &disk)
            .solve_with(&compiled, &disk, dvector![0.2, 1.0], |state| {
                actual.push((state.x().to_vec(), state.fx()));
            })
            .unwrap();

        assert_eq!(solution.iters(), expected.len());
        assert_eq!(actual.len(), expected.len());

        for ((x, fx), (x_expected, fx_expected)) in actual.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*fx, *fx_expected, epsilon = 1e-10);
            assert_abs_diff_eq!(x[0], x_expected[0], epsilon = 1e-10);
            assert_abs_diff_eq!(x[1], x_expected[1], epsilon = 1e-10);
        }
    }

    #[test]
    fn non_zero_status() {
        let f = GeneratedFunction::new("failing", failing, failing_work);
        let mut out = [0.0];

        let result = f.call(&[&[1.0]], &mut [&mut out[..]]);

        assert!(matches!(
            result,
            Err(ProblemError::Generated {
                name: "failing",
                status: 3
            })
        ));
    }

    #[test]
    fn status_propagates_from_solve() {
        let failing = GeneratedFunction::new("failing", failing, failing_work);
        let compiled = Compiled::new(2, failing, failing, failing);
        let disk = Disk::unit(2);

        let result = Pgd::new(&compiled, &disk).solve(&compiled, &disk, dvector![0.1, 0.1]);

        assert!(result.is_err());
    }

    #[test]
    fn missing_arguments() {
        let f = double_well_compiled();
        let disk = Disk::new(vec![0.0, 1.2], 0.5);
        let projection = GeneratedFunction::new(
            "double_well_projection",
            double_well_projection,
            double_well_projection_work,
        );
        let mut out = [0.0, 0.0];

        let args: [&[f64]; 2] = [&[0.0, 3.2], disk.center().as_slice()];
        let result = projection.call(&args, &mut [&mut out[..]]);

        assert!(matches!(
            result,
            Err(ProblemError::InvalidArguments {
                expected: 3,
                got: 2,
                ..
            })
        ));

        assert!(matches!(
            f.apply(&dvector![0.0, 1.0, 2.0]),
            Err(ProblemError::InvalidDimensionality)
        ));
    }
}
