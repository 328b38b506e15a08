//! Flory-Huggins chi interaction model.

use crate::error::{Result, ScftError};
use nalgebra::DMatrix;

/// Symmetric chi matrix together with the derived quantities used by the
/// SCFT residual: its inverse, the idempotent projector and the sum of all
/// inverse elements.
#[derive(Debug, Clone)]
pub struct ChiInteraction {
    chi: DMatrix<f64>,
    chi_inverse: DMatrix<f64>,
    idempotent: DMatrix<f64>,
    sum_inverse: f64,
}

impl ChiInteraction {
    pub fn new(chi: DMatrix<f64>) -> Result<Self> {
        if chi.nrows() != chi.ncols() {
            return Err(ScftError::ShapeMismatch {
                what: "chi matrix columns",
                expected: chi.nrows(),
                actual: chi.ncols(),
            });
        }
        if chi.nrows() == 0 {
            return Err(ScftError::InvalidSettings(
                "chi matrix must have at least one monomer type".into(),
            ));
        }
        let n = chi.nrows();
        let mut interaction = Self {
            chi,
            chi_inverse: DMatrix::zeros(n, n),
            idempotent: DMatrix::zeros(n, n),
            sum_inverse: 0.0,
        };
        interaction.update_members()?;
        Ok(interaction)
    }

    /// Builds a symmetric chi matrix from row-major data.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        for row in rows {
            if row.len() != n {
                return Err(ScftError::ShapeMismatch {
                    what: "chi matrix row",
                    expected: n,
                    actual: row.len(),
                });
            }
        }
        Self::new(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }

    pub fn n_monomer(&self) -> usize {
        self.chi.nrows()
    }

    pub fn chi(&self, i: usize, j: usize) -> f64 {
        self.chi[(i, j)]
    }

    pub fn chi_inverse(&self, i: usize, j: usize) -> f64 {
        self.chi_inverse[(i, j)]
    }

    pub fn idempotent(&self, i: usize, j: usize) -> f64 {
        self.idempotent[(i, j)]
    }

    pub fn sum_inverse(&self) -> f64 {
        self.sum_inverse
    }

    /// Sets `chi(i, j)` and `chi(j, i)` and refreshes the derived matrices.
    ///
    /// A change that makes the matrix singular is rolled back.
    pub fn set_chi(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        let n = self.n_monomer();
        for index in [i, j] {
            if index >= n {
                return Err(ScftError::InvalidParameterIndex {
                    what: "monomer",
                    index,
                    count: n,
                });
            }
        }
        let old = self.chi[(i, j)];
        self.chi[(i, j)] = value;
        self.chi[(j, i)] = value;
        if let Err(err) = self.update_members() {
            self.chi[(i, j)] = old;
            self.chi[(j, i)] = old;
            self.update_members()?;
            return Err(err);
        }
        Ok(())
    }

    /// Excess free energy per monomer for uniform volume fractions `c`.
    pub fn f_helmholtz(&self, c: &[f64]) -> f64 {
        let n = self.n_monomer();
        let mut sum = 0.0;
        for i in 0..n {
            for j in 0..n {
                sum += self.chi[(i, j)] * c[i] * c[j];
            }
        }
        0.5 * sum
    }

    /// Chemical potentials `w_i = Σ_j chi(i, j) c_j`, without pressure.
    pub fn compute_w(&self, c: &[f64], w: &mut [f64]) {
        let n = self.n_monomer();
        for i in 0..n {
            w[i] = (0..n).map(|j| self.chi[(i, j)] * c[j]).sum();
        }
    }

    pub fn chi_rows(&self) -> Vec<Vec<f64>> {
        self.chi
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    fn update_members(&mut self) -> Result<()> {
        let n = self.n_monomer();
        let inverse = self
            .chi
            .clone()
            .try_inverse()
            .ok_or(ScftError::SingularInteraction)?;
        if inverse.iter().any(|v| !v.is_finite()) {
            return Err(ScftError::SingularInteraction);
        }
        let sum_inverse: f64 = inverse.iter().sum();
        if sum_inverse == 0.0 || !sum_inverse.is_finite() {
            return Err(ScftError::SingularInteraction);
        }

        // P = I - e (e^T chi^-1) / (e^T chi^-1 e), which annihilates the
        // uniform vector e.
        let mut idempotent = DMatrix::identity(n, n);
        for j in 0..n {
            let column_sum: f64 = (0..n).map(|k| inverse[(k, j)]).sum();
            for i in 0..n {
                idempotent[(i, j)] -= column_sum / sum_inverse;
            }
        }

        self.chi_inverse = inverse;
        self.idempotent = idempotent;
        self.sum_inverse = sum_inverse;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn diblock(chi: f64) -> ChiInteraction {
        ChiInteraction::from_rows(&[vec![0.0, chi], vec![chi, 0.0]]).expect("invertible chi")
    }

    #[test]
    fn two_monomer_inverse_and_sum() {
        let interaction = diblock(10.0);
        assert_relative_eq!(interaction.chi_inverse(0, 1), 0.1, epsilon = 1e-14);
        assert_relative_eq!(interaction.chi_inverse(0, 0), 0.0, epsilon = 1e-14);
        assert_relative_eq!(interaction.sum_inverse(), 0.2, epsilon = 1e-14);
    }

    #[test]
    fn idempotent_matrix_is_a_projector_annihilating_uniform_fields() {
        let interaction = ChiInteraction::from_rows(&[
            vec![0.0, 12.0, 20.0],
            vec![12.0, 0.0, 15.0],
            vec![20.0, 15.0, 0.0],
        ])
        .unwrap();
        let n = interaction.n_monomer();
        for i in 0..n {
            let row_on_uniform: f64 = (0..n).map(|j| interaction.idempotent(i, j)).sum();
            assert_relative_eq!(row_on_uniform, 0.0, epsilon = 1e-12);
            for j in 0..n {
                let squared: f64 = (0..n)
                    .map(|k| interaction.idempotent(i, k) * interaction.idempotent(k, j))
                    .sum();
                assert_relative_eq!(squared, interaction.idempotent(i, j), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn set_chi_is_symmetric_and_refreshes_inverse() {
        let mut interaction = diblock(10.0);
        interaction.set_chi(1, 0, 14.0).unwrap();
        assert_eq!(interaction.chi(0, 1), 14.0);
        assert_eq!(interaction.chi(1, 0), 14.0);
        assert_relative_eq!(interaction.sum_inverse(), 2.0 / 14.0, epsilon = 1e-14);
    }

    #[test]
    fn singular_update_is_rolled_back() {
        let mut interaction = diblock(10.0);
        let err = interaction.set_chi(0, 1, 0.0).expect_err("zero chi is singular");
        assert!(matches!(err, ScftError::SingularInteraction));
        assert_eq!(interaction.chi(0, 1), 10.0);
        assert_relative_eq!(interaction.sum_inverse(), 0.2, epsilon = 1e-14);
    }

    #[test]
    fn set_chi_rejects_unknown_monomer() {
        let mut interaction = diblock(10.0);
        let err = interaction.set_chi(0, 2, 1.0).expect_err("index out of range");
        assert!(matches!(
            err,
            ScftError::InvalidParameterIndex { index: 2, count: 2, .. }
        ));
    }

    #[test]
    fn excess_free_energy_of_symmetric_blend() {
        let interaction = diblock(10.0);
        assert_relative_eq!(interaction.f_helmholtz(&[0.5, 0.5]), 2.5, epsilon = 1e-14);
        let mut w = [0.0; 2];
        interaction.compute_w(&[0.25, 0.75], &mut w);
        assert_relative_eq!(w[0], 7.5, epsilon = 1e-14);
        assert_relative_eq!(w[1], 2.5, epsilon = 1e-14);
    }
}
