//! Periodic unit cell of the simulation domain.

use crate::error::{Result, ScftError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LatticeSystem {
    Lamellar,
    Square,
    Rectangular,
    Hexagonal,
    Cubic,
    Tetragonal,
    Orthorhombic,
}

impl LatticeSystem {
    /// Number of independent lattice parameters.
    pub fn n_parameter(self) -> usize {
        match self {
            LatticeSystem::Lamellar
            | LatticeSystem::Square
            | LatticeSystem::Hexagonal
            | LatticeSystem::Cubic => 1,
            LatticeSystem::Rectangular | LatticeSystem::Tetragonal => 2,
            LatticeSystem::Orthorhombic => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCell {
    lattice: LatticeSystem,
    parameters: Vec<f64>,
}

impl UnitCell {
    pub fn new(lattice: LatticeSystem, parameters: Vec<f64>) -> Result<Self> {
        let mut cell = Self {
            lattice,
            parameters: vec![0.0; lattice.n_parameter()],
        };
        cell.set_parameters(&parameters)?;
        Ok(cell)
    }

    pub fn lattice(&self) -> LatticeSystem {
        self.lattice
    }

    pub fn n_parameter(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        if parameters.len() != self.lattice.n_parameter() {
            return Err(ScftError::ShapeMismatch {
                what: "unit cell parameters",
                expected: self.lattice.n_parameter(),
                actual: parameters.len(),
            });
        }
        if let Some(bad) = parameters.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
            return Err(ScftError::InvalidSettings(format!(
                "unit cell parameter must be positive, got {bad}"
            )));
        }
        self.parameters.copy_from_slice(parameters);
        Ok(())
    }
}
