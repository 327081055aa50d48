use apgd::compiled::{Compiled, GeneratedFunction, WorkSize};
use apgd::prelude::*;

// Functions below follow the calling convention of generated code: argument
// and result slices plus integer and real work arrays.

fn objective(arg: &[&[f64]], res: &mut [&mut [f64]], _iw: &mut [i64], w: &mut [f64]) -> i32 {
    let (x1, x2) = (arg[0][0], arg[0][1]);
    w[0] = x1 * x1 - 1.0;
    w[1] = x2 * x2 - 2.0;
    res[0][0] = 15.0 * w[0] * w[0] + w[1] * w[1] + 4.0 * x1 * x2 + x1 + x2;
    0
}

fn objective_work() -> WorkSize {
    WorkSize::new(1, 1, 0, 2)
}

fn gradient(arg: &[&[f64]], res: &mut [&mut [f64]], _iw: &mut [i64], _w: &mut [f64]) -> i32 {
    let (x1, x2) = (arg[0][0], arg[0][1]);
    res[0][0] = 60.0 * x1 * (x1 * x1 - 1.0) + 4.0 * x2 + 1.0;
    res[0][1] = 4.0 * x2 * (x2 * x2 - 2.0) + 4.0 * x1 + 1.0;
    0
}

fn gradient_work() -> WorkSize {
    WorkSize::new(1, 1, 0, 0)
}

fn projection(arg: &[&[f64]], res: &mut [&mut [f64]], _iw: &mut [i64], _w: &mut [f64]) -> i32 {
    let (x, center, radius) = (arg[0], arg[1], arg[2][0]);

    let dist = x
        .iter()
        .zip(center)
        .map(|(xi, ci)| (xi - ci) * (xi - ci))
        .sum::<f64>()
        .sqrt();

    for (i, pxi) in res[0].iter_mut().enumerate() {
        *pxi = if dist > radius {
            center[i] + radius * (x[i] - center[i]) / dist
        } else {
            x[i]
        };
    }

    0
}

fn projection_work() -> WorkSize {
    WorkSize::new(3, 1, 0, 0)
}

fn main() -> Result<(), String> {
    let f = Compiled::new(
        2,
        GeneratedFunction::new("objective", objective, objective_work),
        GeneratedFunction::new("gradient", gradient, gradient_work),
        GeneratedFunction::new("projection", projection, projection_work),
    );
    let disk = Disk::new(vec![0.0, 1.2], 0.5);

    let driver = PgdDriver::builder(&f, disk)
        .with_initial(vec![0.2, 1.0])
        .build();

    let solution = driver.solve().map_err(|error| format!("{error}"))?;
    println!("{}", solution);

    Ok(())
}
