use apgd::nalgebra as na;
use apgd::prelude::*;
use na::{DimName, IsContiguous};

// Two local minima on the boundary of the disk, reached from different
// starting points.
struct DoubleWell;

impl Problem for DoubleWell {
    type Scalar = f64;
    type Dim = na::U2;

    fn dim(&self) -> Self::Dim {
        na::U2::name()
    }
}

impl Function for DoubleWell {
    fn apply<Sx>(&self, x: &na::Vector<f64, na::U2, Sx>) -> Result<f64, ProblemError>
    where
        Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
    {
        let (x1, x2) = (x[0], x[1]);
        Ok(15.0 * (x1 * x1 - 1.0).powi(2) + (x2 * x2 - 2.0).powi(2) + 4.0 * x1 * x2 + x1 + x2)
    }
}

impl Evaluator for DoubleWell {
    fn gradient<Sx, Sg>(
        &self,
        x: &na::Vector<f64, na::U2, Sx>,
        grad: &mut na::Vector<f64, na::U2, Sg>,
    ) -> Result<(), ProblemError>
    where
        Sx: na::storage::Storage<f64, na::U2> + IsContiguous,
        Sg: na::storage::StorageMut<f64, na::U2> + IsContiguous,
    {
        let (x1, x2) = (x[0], x[1]);
        grad[0] = 60.0 * x1 * (x1 * x1 - 1.0) + 4.0 * x2 + 1.0;
        grad[1] = 4.0 * x2 * (x2 * x2 - 2.0) + 4.0 * x1 + 1.0;
        Ok(())
    }
}

fn main() -> Result<(), String> {
    let f = DoubleWell;
    let disk = Disk::new(vec![0.0, 1.2], 0.5);

    let driver = PgdDriver::new(&f, disk);
    let solutions = driver
        .solve_from(vec![vec![0.2, 1.0], vec![-0.07, -1.45]])
        .map_err(|error| format!("{error}"))?;

    let radius = driver.disk().radius();

    for solution in solutions {
        let x = solution.x();
        let g = driver.disk().distance(x).powi(2);

        println!("{}", solution);
        println!("f({}, {}) = {}", x[0], x[1], solution.fx());
        println!("g({}, {}) = {} <= {}", x[0], x[1], g, radius * radius);
    }

    Ok(())
}
