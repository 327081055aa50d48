use nalgebra::{Dim, RealField};
use thiserror::Error;

/// The base trait for [`Function`](super::function::Function) and
/// [`Evaluator`](super::evaluator::Evaluator).
pub trait Problem {
    /// Type of the scalar, usually f32 or f64.
    type Scalar: RealField + Copy;

    /// Dimension of the problem. Can be fixed
    /// ([`Const`](nalgebra::base::dimension::Const)) or dynamic
    /// ([`Dynamic`](nalgebra::base::dimension::Dynamic)).
    type Dim: Dim;

    /// Return the actual dimension of the problem. This is needed for dynamic
    /// problems.
    fn dim(&self) -> Self::Dim;
}

/// Error encountered while evaluating the objective, the gradient or the
/// projection.
#[derive(Debug, Error)]
pub enum ProblemError {
    /// The number of variables does not match the dimensionality
    /// ([`Problem::dim`]) of the problem or of the disk.
    #[error("invalid dimensionality")]
    InvalidDimensionality,
    /// A generated function was given fewer arguments or results than it
    /// reported in its work size.
    #[error("function `{name}` expects {expected} arguments or results, got {got}")]
    InvalidArguments {
        /// Name of the generated function.
        name: &'static str,
        /// Expected number.
        expected: usize,
        /// Actual number.
        got: usize,
    },
    /// A generated function returned a non-zero status.
    #[error("function `{name}` failed with status {status}")]
    Generated {
        /// Name of the generated function.
        name: &'static str,
        /// Returned status.
        status: i32,
    },
    /// A custom error specific to the problem.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}
