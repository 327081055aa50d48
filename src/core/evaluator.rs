use nalgebra::{
    storage::{Storage, StorageMut},
    IsContiguous, Vector,
};

use super::{base::ProblemError, disk::Disk, function::Function};

/// Capabilities required by the [`Pgd`](crate::solver::Pgd) solver: the
/// objective (through [`Function`]), its gradient and the projection onto the
/// feasible disk.
///
/// The solver does not care how the evaluations are produced. A closed-form
/// problem implements [`gradient`](Evaluator::gradient) by hand and keeps the
/// default Euclidean [`project`](Evaluator::project); the
/// [`Compiled`](crate::compiled::Compiled) adapter forwards all three to
/// ahead-of-time generated functions; the
/// [`FiniteDifference`](crate::derivatives::FiniteDifference) adapter
/// approximates the gradient of any [`Function`].
///
/// All evaluations are expected to be pure.
///
/// ```rust
/// use apgd::nalgebra as na;
/// use apgd::prelude::*;
/// use na::{DimName, IsContiguous};
///
/// struct Paraboloid;
///
/// impl Problem for Paraboloid {
///     type Scalar = f64;
///     type Dim = na::U2;
///
///     fn dim(&self) -> Self::Dim {
///         na::U2::name()
///     }
/// }
///
/// impl Function for Paraboloid {
///     fn apply<Sx>(&self, x: &na::Vector<f64, na::U2, Sx>) -> Result<f64, ProblemError>
///     where
///         Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
///     {
///         Ok((x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2))
///     }
/// }
///
/// impl Evaluator for Paraboloid {
///     fn gradient<Sx, Sg>(
///         &self,
///         x: &na::Vector<f64, na::U2, Sx>,
///         grad: &mut na::Vector<f64, na::U2, Sg>,
///     ) -> Result<(), ProblemError>
///     where
///         Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
///         Sg: na::storage::StorageMut<f64, na::U2> + IsContiguous,
///     {
///         grad[0] = 2.0 * (x[0] - 1.0);
///         grad[1] = 2.0 * (x[1] - 2.0);
///         Ok(())
///     }
/// }
/// ```
pub trait Evaluator: Function {
    /// Calculate the gradient of the objective given values of the variables.
    fn gradient<Sx, Sg>(
        &self,
        x: &Vector<Self::Scalar, Self::Dim, Sx>,
        grad: &mut Vector<Self::Scalar, Self::Dim, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Sg: StorageMut<Self::Scalar, Self::Dim> + IsContiguous;

    /// Project `x` onto the disk and store the result in `px`.
    ///
    /// If not overridden, the Euclidean projection of [`Disk::project`] is
    /// used.
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
        px.copy_from(x);
        disk.project(px);
        Ok(())
    }
}
