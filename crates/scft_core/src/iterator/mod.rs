//! Anderson-mixing solution of the SCFT fixed-point equations.

pub mod anderson;
pub mod dense;

pub use anderson::{residual_error, AmIterator};
pub use dense::DenseSolver;

use crate::error::{Result, ScftError};
use serde::{Deserialize, Serialize};

/// Scale applied to stress residuals before comparing them with field
/// residuals in the convergence test.
pub const DEFAULT_STRESS_SCALE: f64 = 100.0;

/// Settings for the Anderson mixing iterator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AmSettings {
    /// Maximum number of mixing iterations per solve.
    pub max_itr: usize,
    /// Convergence tolerance on the scaled maximum residual.
    pub epsilon: f64,
    /// Number of prior residual differences used in the minimisation.
    pub max_hist: usize,
    /// Relax unit-cell parameters together with the fields.
    #[serde(default)]
    pub is_flexible: bool,
    #[serde(default = "default_stress_scale")]
    pub stress_scale: f64,
}

fn default_stress_scale() -> f64 {
    DEFAULT_STRESS_SCALE
}

impl Default for AmSettings {
    fn default() -> Self {
        Self {
            max_itr: 100,
            epsilon: 1e-8,
            max_hist: 10,
            is_flexible: false,
            stress_scale: DEFAULT_STRESS_SCALE,
        }
    }
}

impl AmSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_itr == 0 {
            return Err(ScftError::InvalidSettings(
                "max_itr must be greater than zero".into(),
            ));
        }
        if !(self.epsilon > 0.0) {
            return Err(ScftError::InvalidSettings("epsilon must be positive".into()));
        }
        if self.max_hist == 0 {
            return Err(ScftError::InvalidSettings(
                "max_hist must be greater than zero".into(),
            ));
        }
        if !(self.stress_scale > 0.0) {
            return Err(ScftError::InvalidSettings(
                "stress_scale must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one call to [`AmIterator::solve`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SolveStatus {
    Converged,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SolveReport {
    pub status: SolveStatus,
    /// Iterations performed; the iteration that met the tolerance counts.
    pub iterations: usize,
    /// Scaled maximum residual at the last convergence test.
    pub error: f64,
}

impl SolveReport {
    pub fn is_converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }

    /// Converts a failed solve into [`ScftError::ConvergenceFailure`].
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            SolveStatus::Converged => Ok(self),
            SolveStatus::Failed => Err(ScftError::ConvergenceFailure {
                iterations: self.iterations,
                error: self.error,
            }),
        }
    }
}
