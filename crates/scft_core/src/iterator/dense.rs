//! LU solve for the small symmetric system of Anderson mixing coefficients.

use crate::error::{Result, ScftError};
use nalgebra::{DMatrix, DVector};

/// Pivots smaller than this fraction of the largest matrix entry are
/// treated as zero.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Work storage for solving `U c = v` with `U` at most `capacity` square.
///
/// The system is loaded into the leading `n x n` block and factorised in
/// place with partial pivoting, so repeated solves do not allocate.
#[derive(Debug, Clone)]
pub struct DenseSolver {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    pivots: Vec<usize>,
}

impl DenseSolver {
    pub fn new(capacity: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(capacity, capacity),
            rhs: DVector::zeros(capacity),
            pivots: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.rhs.len()
    }

    /// Coefficients from the most recent successful [`DenseSolver::solve`].
    pub fn solution(&self, n: usize) -> &[f64] {
        &self.rhs.as_slice()[..n.min(self.capacity())]
    }

    /// Copies the leading `n x n` block of `u` and the first `n` entries of
    /// `v` into the work storage.
    pub fn load(&mut self, u: &DMatrix<f64>, v: &DVector<f64>, n: usize) -> Result<()> {
        if n > self.capacity() || n > u.nrows() || n > u.ncols() || n > v.len() {
            return Err(ScftError::ShapeMismatch {
                what: "mixing system",
                expected: self.capacity(),
                actual: n,
            });
        }
        for i in 0..n {
            for j in 0..n {
                self.matrix[(i, j)] = u[(i, j)];
            }
            self.rhs[i] = v[i];
        }
        Ok(())
    }

    /// Solves the loaded `n x n` system, returning the coefficients.
    pub fn solve(&mut self, n: usize) -> Result<&[f64]> {
        if n == 0 || n > self.capacity() {
            return Err(ScftError::ShapeMismatch {
                what: "mixing system",
                expected: self.capacity(),
                actual: n,
            });
        }

        let mut scale = 0.0_f64;
        for i in 0..n {
            for j in 0..n {
                scale = scale.max(self.matrix[(i, j)].abs());
            }
        }
        if !scale.is_finite() || scale == 0.0 {
            return Err(ScftError::SingularHistoryMatrix { size: n });
        }
        let tolerance = SINGULAR_TOLERANCE * scale;

        if n == 1 {
            let pivot = self.matrix[(0, 0)];
            if pivot.abs() <= tolerance {
                return Err(ScftError::SingularHistoryMatrix { size: 1 });
            }
            self.rhs[0] /= pivot;
            return Ok(&self.rhs.as_slice()[..1]);
        }

        // Doolittle LU with partial pivoting; L and U overwrite the matrix.
        for k in 0..n {
            let mut pivot_row = k;
            for i in (k + 1)..n {
                if self.matrix[(i, k)].abs() > self.matrix[(pivot_row, k)].abs() {
                    pivot_row = i;
                }
            }
            if self.matrix[(pivot_row, k)].abs() <= tolerance {
                return Err(ScftError::SingularHistoryMatrix { size: n });
            }
            self.pivots[k] = pivot_row;
            if pivot_row != k {
                self.matrix.swap_rows(k, pivot_row);
            }
            let pivot = self.matrix[(k, k)];
            for i in (k + 1)..n {
                let factor = self.matrix[(i, k)] / pivot;
                self.matrix[(i, k)] = factor;
                for j in (k + 1)..n {
                    let update = factor * self.matrix[(k, j)];
                    self.matrix[(i, j)] -= update;
                }
            }
        }

        for k in 0..n {
            let p = self.pivots[k];
            if p != k {
                self.rhs.swap_rows(k, p);
            }
        }
        for i in 1..n {
            let mut sum = self.rhs[i];
            for j in 0..i {
                sum -= self.matrix[(i, j)] * self.rhs[j];
            }
            self.rhs[i] = sum;
        }
        for i in (0..n).rev() {
            let mut sum = self.rhs[i];
            for j in (i + 1)..n {
                sum -= self.matrix[(i, j)] * self.rhs[j];
            }
            self.rhs[i] = sum / self.matrix[(i, i)];
        }

        if self.rhs.iter().take(n).any(|c| !c.is_finite()) {
            return Err(ScftError::SingularHistoryMatrix { size: n });
        }
        Ok(&self.rhs.as_slice()[..n])
    }
}
