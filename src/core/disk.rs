//! Feasible set of a problem, a closed Euclidean disk (ball in higher
//! dimensions).

use nalgebra::{
    convert,
    storage::{Storage, StorageMut},
    Dim, DimName, Dynamic, OVector, RealField, Vector, U1,
};
use rand::Rng;
use rand_distr::StandardNormal;

/// Closed disk `{ x : || x - center || <= radius }`.
///
/// The disk is defined once before solving and is never changed by the
/// solver.
#[derive(Debug, Clone)]
pub struct Disk<T: RealField + Copy> {
    center: OVector<T, Dynamic>,
    radius: T,
}

impl<T: RealField + Copy> Disk<T> {
    /// Creates a disk with given center and radius.
    pub fn new(center: Vec<T>, radius: T) -> Self {
        assert!(!center.is_empty(), "empty disk");
        assert!(
            radius.is_finite() && radius >= T::zero(),
            "radius must be finite and non-negative"
        );

        let n = Dynamic::new(center.len());
        let center = OVector::from_vec_generic(n, U1::name(), center);

        Self { center, radius }
    }

    /// Creates a disk with unit radius centered at the origin.
    pub fn unit(dim: usize) -> Self {
        Self::new(vec![T::zero(); dim], T::one())
    }

    /// Gets the dimension of the disk.
    pub fn dim(&self) -> usize {
        self.center.nrows()
    }

    /// Gets the center.
    pub fn center(&self) -> &OVector<T, Dynamic> {
        &self.center
    }

    /// Gets the radius.
    pub fn radius(&self) -> T {
        self.radius
    }

    /// Euclidean distance of given point from the center.
    pub fn distance<D, Sx>(&self, x: &Vector<T, D, Sx>) -> T
    where
        D: Dim,
        Sx: Storage<T, D>,
    {
        x.iter()
            .zip(self.center.iter())
            .fold(T::zero(), |acc, (xi, ci)| {
                let d = *xi - *ci;
                acc + d * d
            })
            .sqrt()
    }

    /// Tests whether given point lies in the disk, with tolerance `eps` on the
    /// radius.
    pub fn contains<D, Sx>(&self, x: &Vector<T, D, Sx>, eps: T) -> bool
    where
        D: Dim,
        Sx: Storage<T, D>,
    {
        self.distance(x) <= self.radius + eps
    }

    /// Projects given point onto the disk and returns whether the point was
    /// outside.
    ///
    /// Points outside are moved along the ray from the center to the
    /// boundary, points inside are left untouched. A point with NaN
    /// components is left untouched as well.
    pub fn project<D, Sx>(&self, x: &mut Vector<T, D, Sx>) -> bool
    where
        D: Dim,
        Sx: StorageMut<T, D>,
    {
        let dist = self.distance(x);

        if dist > self.radius {
            let radius = self.radius;
            x.iter_mut()
                .zip(self.center.iter())
                .for_each(|(xi, ci)| *xi = *ci + radius * (*xi - *ci) / dist);
            true
        } else {
            false
        }
    }

    /// Samples a point uniformly in the disk.
    pub fn sample<D, Sx, R>(&self, x: &mut Vector<T, D, Sx>, rng: &mut R)
    where
        D: Dim,
        Sx: StorageMut<T, D>,
        R: Rng,
    {
        let n = self.dim();

        // Uniform direction from a normalized Gaussian vector, uniform volume
        // from the radius scaled by u^(1/n).
        let mut direction = vec![0.0f64; n];
        let mut norm2 = 0.0;

        for di in direction.iter_mut() {
            *di = rng.sample(StandardNormal);
            norm2 += *di * *di;
        }

        if norm2 == 0.0 {
            direction[0] = 1.0;
            norm2 = 1.0;
        }

        let u: f64 = rng.gen();
        let scale = self.radius * convert::<f64, T>(u.powf(1.0 / n as f64) / norm2.sqrt());

        x.iter_mut()
            .zip(self.center.iter())
            .zip(direction.iter())
            .for_each(|((xi, ci), di)| *xi = *ci + scale * convert::<f64, T>(*di));
    }
}
