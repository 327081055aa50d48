//! Finite-difference approximation of derivatives.
//!
//! [`FiniteDifference`] turns any [`Function`] into an [`Evaluator`] by
//! approximating the gradient with forward differences. It costs one extra
//! evaluation of the objective per variable, so closed-form or generated
//! gradients should be preferred when available.

use nalgebra::{
    allocator::Allocator,
    convert,
    storage::{Storage, StorageMut},
    ComplexField, DefaultAllocator, Dim, IsContiguous, RealField, Vector,
};
use num_traits::One;

use crate::core::{Evaluator, Function, Problem, ProblemError};

/// Square root of double precision machine epsilon. This value is a standard
/// constant for epsilons in approximating first-order derivate-based concepts.
pub const EPSILON_SQRT: f64 = 0.000000014901161193847656;

/// Evaluator with gradient approximated by forward differences of the wrapped
/// function.
///
/// The projection is the default Euclidean projection onto the disk.
#[derive(Debug)]
pub struct FiniteDifference<'f, F> {
    f: &'f F,
}

impl<'f, F: Function> FiniteDifference<'f, F> {
    /// Wraps given function.
    pub fn new(f: &'f F) -> Self {
        Self { f }
    }

    /// Gets the wrapped function.
    pub fn inner(&self) -> &'f F {
        self.f
    }
}

impl<'f, F: Function> Problem for FiniteDifference<'f, F> {
    type Scalar = F::Scalar;
    type Dim = F::Dim;

    fn dim(&self) -> Self::Dim {
        self.f.dim()
    }
}

impl<'f, F: Function> Function for FiniteDifference<'f, F> {
    fn apply<Sx>(&self, x: &Vector<Self::Scalar, Self::Dim, Sx>) -> Result<Self::Scalar, ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
    {
        self.f.apply(x)
    }
}

impl<'f, F: Function> Evaluator for FiniteDifference<'f, F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    fn gradient<Sx, Sg>(
        &self,
        x: &Vector<Self::Scalar, Self::Dim, Sx>,
        grad: &mut Vector<Self::Scalar, Self::Dim, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: Storage<Self::Scalar, Self::Dim> + IsContiguous,
        Sg: StorageMut<Self::Scalar, Self::Dim> + IsContiguous,
    {
        let eps: F::Scalar = convert(EPSILON_SQRT);
        let fx = self.f.apply(x)?;
        let mut x = x.clone_owned();

        for i in 0..self.f.dim().value() {
            let xi = x[i];

            // Step scaled by the magnitude of the variable, at least by one.
            let step = eps * xi.abs().max(F::Scalar::one()) * F::Scalar::one().copysign(xi);

            x[i] = xi + step;
            let fxi = self.f.apply(&x)?;

            // grad[i] = (f(x + e_i * step_i) - f(x)) / step_i
            grad[i] = (fxi - fx) / step;

            x[i] = xi;
        }

        Ok(())
    }
}
