//! The collection of implemented solvers.
//!
//! Currently only [`Pgd`], an accelerated projected gradient descent for
//! smooth problems constrained to a [`Disk`](crate::core::Disk).

pub mod pgd;

pub use pgd::{
    momentum_step, FallbackAnchor, Pgd, PgdError, PgdIterState, PgdOptions, PgdSolution, Step,
    Termination,
};
