//! High-level API for solving.
//!
//! The driver encapsulates the problem, its disk, the solver options and the
//! initial point, and provides a simple API to run single or multi-start
//! solves.
//!
//! The simplest way of using the driver is to initialize it with the defaults.
//! The initial point is then the center of the disk:
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
//! #
//! let f = Paraboloid;
//! let driver = PgdDriver::new(&f, Disk::unit(2));
//! ```
//!
//! If you need to specify additional settings, use the builder:
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
//! #
//! let f = Paraboloid;
//!
//! let mut options = PgdOptions::default();
//! options.set_max_iters(50);
//!
//! let driver = PgdDriver::builder(&f, Disk::unit(2))
//!     .with_initial(vec![0.5, 0.5])
//!     .with_options(options)
//!     .build();
//!
//! let solution = driver.solve().expect("no solver error");
//! println!("{}", solution);
//! ```
//!
//! Nonconvex problems may have several local minima in the disk. Multi-start
//! runs independent solves from points sampled uniformly in the disk and picks
//! the best result:
//!
//! ```rust
//! use apgd::prelude::*;
//! use rand::{rngs::StdRng, SeedableRng};
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
//! #
//! let f = Paraboloid;
//! let driver = PgdDriver::new(&f, Disk::new(vec![0.0, 1.2], 0.5));
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let result = driver.multistart(10, &mut rng).expect("no solver error");
//!
//! if let Some(best) = result.best() {
//!     println!("{}", best);
//! }
//! ```

use log::debug;
use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, DimName, OVector, RealField, U1};
use rand::Rng;

use crate::core::{Disk, Evaluator, Problem, ProblemError};
use crate::solver::{Pgd, PgdError, PgdOptions, PgdSolution};

/// Builder for the [`PgdDriver`].
pub struct PgdBuilder<'a, F: Problem> {
    f: &'a F,
    disk: Disk<F::Scalar>,
    options: PgdOptions<F>,
    x0: Vec<F::Scalar>,
}

impl<'a, F: Problem> PgdBuilder<'a, F> {
    fn new(f: &'a F, disk: Disk<F::Scalar>) -> Self {
        let x0 = disk.center().iter().copied().collect();

        Self {
            f,
            disk,
            options: PgdOptions::default(),
            x0,
        }
    }

    /// Sets the initial point from which the iterative process starts.
    pub fn with_initial(mut self, x0: Vec<F::Scalar>) -> Self {
        self.x0 = x0;
        self
    }

    /// Sets the options of the solver.
    pub fn with_options(mut self, options: PgdOptions<F>) -> Self {
        self.options = options;
        self
    }

    /// Builds the [`PgdDriver`].
    pub fn build(self) -> PgdDriver<'a, F> {
        let PgdBuilder {
            f,
            disk,
            options,
            x0,
        } = self;

        let pgd = Pgd::with_options(f, &disk, options);

        PgdDriver { f, disk, pgd, x0 }
    }
}

/// The driver for the process of solving a problem constrained to a disk.
///
/// For default settings, use [`PgdDriver::new`]. For more flexibility, use
/// [`PgdDriver::builder`]. For the usage of the driver, see [module](self)
/// documentation.
pub struct PgdDriver<'a, F: Problem> {
    f: &'a F,
    disk: Disk<F::Scalar>,
    pgd: Pgd<F>,
    x0: Vec<F::Scalar>,
}

impl<'a, F: Problem> PgdDriver<'a, F> {
    /// Returns the builder for specifying additional settings.
    pub fn builder(f: &'a F, disk: Disk<F::Scalar>) -> PgdBuilder<'a, F> {
        PgdBuilder::new(f, disk)
    }

    /// Initializes the driver with the default settings.
    pub fn new(f: &'a F, disk: Disk<F::Scalar>) -> Self {
        PgdDriver::builder(f, disk).build()
    }

    /// Returns reference to the disk.
    pub fn disk(&self) -> &Disk<F::Scalar> {
        &self.disk
    }

    /// Returns reference to the configured initial point.
    pub fn initial(&self) -> &[F::Scalar] {
        &self.x0
    }

    /// Returns reference to the solver options.
    pub fn options(&self) -> &PgdOptions<F> {
        self.pgd.options()
    }
}

impl<'a, F: Evaluator> PgdDriver<'a, F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    /// Runs the iterative process from the configured initial point.
    pub fn solve(&self) -> Result<PgdSolution<F>, PgdError> {
        self.solve_one(self.x0.clone())
    }

    /// Runs an independent solve from each of given initial points and returns
    /// the solutions in the same order.
    pub fn solve_from<I>(&self, initials: I) -> Result<Vec<PgdSolution<F>>, PgdError>
    where
        I: IntoIterator<Item = Vec<F::Scalar>>,
    {
        initials.into_iter().map(|x0| self.solve_one(x0)).collect()
    }

    /// Runs `n` independent solves from points sampled uniformly in the disk.
    pub fn multistart<R: Rng>(&self, n: usize, rng: &mut R) -> Result<MultiStart<F>, PgdError> {
        let mut solutions = Vec::with_capacity(n);

        for i in 0..n {
            let mut x0 = OVector::zeros_generic(self.f.dim(), U1::name());
            self.disk.sample(&mut x0, rng);

            let solution = self.pgd.solve(self.f, &self.disk, x0)?;
            debug!(
                "start {}: {} iterations, fx = {}",
                i,
                solution.iters(),
                solution.fx()
            );

            solutions.push(solution);
        }

        let best = select_best(solutions.iter().map(|solution| solution.fx()));

        Ok(MultiStart { solutions, best })
    }

    fn solve_one(&self, x0: Vec<F::Scalar>) -> Result<PgdSolution<F>, PgdError> {
        let dim = self.f.dim();

        if x0.len() != dim.value() {
            return Err(ProblemError::InvalidDimensionality.into());
        }

        let x0 = OVector::from_vec_generic(dim, U1::name(), x0);
        self.pgd.solve(self.f, &self.disk, x0)
    }
}

/// Solutions of a multi-start run.
pub struct MultiStart<F: Problem>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    solutions: Vec<PgdSolution<F>>,
    best: Option<usize>,
}

impl<F: Problem> MultiStart<F>
where
    DefaultAllocator: Allocator<F::Scalar, F::Dim>,
{
    /// Returns all solutions in the order of the starts.
    pub fn solutions(&self) -> &[PgdSolution<F>] {
        &self.solutions
    }

    /// Consumes the result and returns all solutions.
    pub fn into_solutions(self) -> Vec<PgdSolution<F>> {
        self.solutions
    }

    /// Returns the index of the solution with the lowest objective value.
    ///
    /// Solutions with NaN objective are never selected and the earliest one
    /// wins on ties. `None` if there is no such solution.
    pub fn best_index(&self) -> Option<usize> {
        self.best
    }

    /// Returns the solution with the lowest objective value. See
    /// [`best_index`](MultiStart::best_index).
    pub fn best(&self) -> Option<&PgdSolution<F>> {
        self.best.map(|i| &self.solutions[i])
    }
}

fn select_best<T, I>(values: I) -> Option<usize>
where
    T: RealField + Copy,
    I: IntoIterator<Item = T>,
{
    let mut best: Option<(usize, T)> = None;

    for (i, value) in values.into_iter().enumerate() {
        // NaN is not comparable, even with itself.
        if value.partial_cmp(&value).is_none() {
            continue;
        }

        match best {
            Some((_, best_value)) if value >= best_value => {}
            _ => best = Some((i, value)),
        }
    }

    best.map(|(i, _)| i)
}
