//! Core abstractions and types for apgd.
//!
//! *Users* are mainly interested in implementing the [`Function`] and
//! [`Evaluator`] traits and defining the feasible [`Disk`].

mod base;
mod disk;
mod evaluator;
mod function;

pub use base::*;
pub use disk::*;
pub use evaluator::*;
pub use function::*;
