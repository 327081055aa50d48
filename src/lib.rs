#![allow(clippy::many_single_char_names)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # apgd
//!
//! Accelerated projected gradient descent for smooth, possibly nonconvex
//! problems constrained to a disk, written entirely in Rust.
//!
//! The solver combines three techniques:
//!
//! * a step size estimated from the last two points and gradients
//!   (Barzilai-Borwein secant step),
//! * backtracking against a smoothed reference value that allows occasional
//!   increases of the objective (non-monotone line search), with a monotone
//!   fallback search when the accelerated candidate is rejected,
//! * Nesterov momentum extrapolation.
//!
//! See the [`pgd`](solver::pgd) module for the details of the method.
//!
//! ## Problem
//!
//! The problem is to find a local minimum of a smooth objective *f* over a
//! closed Euclidean disk (a ball in higher dimensions):
//!
//! ```text
//! min f(x)  subject to  || x - c || <= r
//! ```
//!
//! When it comes to code, the problem is any type that implements the
//! [`Function`](crate::core::Function) and [`Problem`](crate::core::Problem)
//! traits for the objective and the [`Evaluator`](crate::core::Evaluator)
//! trait for its gradient. The projection onto the disk is provided by
//! default.
//!
//! ```rust
//! // apgd is based on `nalgebra` crate.
//! use apgd::nalgebra as na;
//! use apgd::prelude::*;
//! use na::{DimName, IsContiguous};
//!
//! // A problem is represented by a type.
//! struct Paraboloid;
//!
//! impl Problem for Paraboloid {
//!     // The numeric type. Usually f64 or f32.
//!     type Scalar = f64;
//!     // The dimension of the problem. Can be either statically known or dynamic.
//!     type Dim = na::U2;
//!
//!     fn dim(&self) -> Self::Dim {
//!         na::U2::name()
//!     }
//! }
//!
//! impl Function for Paraboloid {
//!     // Compute the objective value.
//!     fn apply<Sx>(&self, x: &na::Vector<f64, na::U2, Sx>) -> Result<f64, ProblemError>
//!     where
//!         Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
//!     {
//!         Ok((x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2))
//!     }
//! }
//!
//! impl Evaluator for Paraboloid {
//!     // Compute the gradient of the objective.
//!     fn gradient<Sx, Sg>(
//!         &self,
//!         x: &na::Vector<f64, na::U2, Sx>,
//!         grad: &mut na::Vector<f64, na::U2, Sg>,
//!     ) -> Result<(), ProblemError>
//!     where
//!         Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
//!         Sg: na::storage::StorageMut<f64, na::U2> + IsContiguous,
//!     {
//!         grad[0] = 2.0 * (x[0] - 1.0);
//!         grad[1] = 2.0 * (x[1] - 2.0);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! If the gradient is not available, the
//! [`FiniteDifference`](derivatives::FiniteDifference) adapter approximates it.
//! Problems exported by code generators are wrapped by the
//! [`Compiled`](compiled::Compiled) adapter.
//!
//! ## Solving
//!
//! When you have your problem available, you can use the
//! [`PgdDriver`](driver::PgdDriver) to run the iteration process.
//!
//! ```rust
//! use apgd::prelude::*;
//! # use apgd::nalgebra as na;
//! # use na::{DimName, IsContiguous};
//! #
//! # struct Paraboloid;
//! #
//! # impl Problem for Paraboloid {
//! #     type Scalar = f64;
//! #     type Dim = na::U2;
//! #
//! #     fn dim(&self) -> Self::Dim {
//! #         na::U2::name()
//! #     }
//! # }
//! #
//! # impl Function for Paraboloid {
//! #     fn apply<Sx>(&self, x: &na::Vector<f64, na::U2, Sx>) -> Result<f64, ProblemError>
//! #     where
//! #         Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
//! #     {
//! #         Ok((x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2))
//! #     }
//! # }
//! #
//! # impl Evaluator for Paraboloid {
//! #     fn gradient<Sx, Sg>(
//! #         &self,
//! #         x: &na::Vector<f64, na::U2, Sx>,
//! #         grad: &mut na::Vector<f64, na::U2, Sg>,
//! #     ) -> Result<(), ProblemError>
//! #     where
//! #         Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
//! #         Sg: na::storage::StorageMut<f64, na::U2> + IsContiguous,
//! #     {
//! #         grad[0] = 2.0 * (x[0] - 1.0);
//! #         grad[1] = 2.0 * (x[1] - 2.0);
//! #         Ok(())
//! #     }
//! # }
//!
//! let f = Paraboloid;
//! let driver = PgdDriver::builder(&f, Disk::unit(2))
//!     .with_initial(vec![0.5, 0.5])
//!     .build();
//!
//! let solution = driver.solve().expect("solver encountered an error");
//!
//! match solution.termination() {
//!     Termination::Converged => println!("{}", solution),
//!     Termination::MaxIters => println!("maximum number of iterations exceeded"),
//! }
//! ```
//!
//! ## License
//!
//! Licensed under MIT.

pub mod compiled;
pub mod core;
pub mod derivatives;
pub mod driver;
pub mod solver;

pub use crate::core::*;
pub use driver::{MultiStart, PgdDriver};
pub use solver::{Pgd, PgdError, PgdOptions, PgdSolution, Termination};

/// Commonly used items.
pub mod prelude {
    pub use crate::core::{Disk, Evaluator, Function, Problem, ProblemError};
    pub use crate::driver::{MultiStart, PgdDriver};
    pub use crate::solver::{FallbackAnchor, Pgd, PgdError, PgdOptions, PgdSolution, Termination};
}

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
