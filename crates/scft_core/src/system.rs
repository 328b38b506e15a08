//! The host system: species, interaction, unit cell and fields.

use crate::error::{Result, ScftError};
use crate::field::{self, Field, FieldSet};
use crate::interaction::ChiInteraction;
use crate::mixture::Mixture;
use crate::traits::{ParameterHost, Propagator, ScfSystem, SolveContext};
use crate::unit_cell::UnitCell;
use serde::{Deserialize, Serialize};

/// Thermodynamic summary of a converged solution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thermo {
    /// Helmholtz free energy per monomer.
    pub f_helmholtz: f64,
    /// Pressure times monomer reference volume.
    pub pressure: f64,
}

pub struct System<P> {
    mixture: Mixture,
    interaction: ChiInteraction,
    unit_cell: UnitCell,
    n_basis: usize,
    w_fields: FieldSet,
    c_fields: FieldSet,
    stress: Vec<f64>,
    propagator: P,
}

impl<P: Propagator> System<P> {
    pub fn new(
        mixture: Mixture,
        interaction: ChiInteraction,
        unit_cell: UnitCell,
        n_basis: usize,
        propagator: P,
    ) -> Result<Self> {
        mixture.validate()?;
        if interaction.n_monomer() != mixture.n_monomer() {
            return Err(ScftError::ShapeMismatch {
                what: "chi matrix size",
                expected: mixture.n_monomer(),
                actual: interaction.n_monomer(),
            });
        }
        if n_basis == 0 {
            return Err(ScftError::InvalidSettings(
                "number of basis functions must be positive".into(),
            ));
        }
        let n_monomer = mixture.n_monomer();
        let n_parameter = unit_cell.n_parameter();
        Ok(Self {
            mixture,
            interaction,
            unit_cell,
            n_basis,
            w_fields: field::allocate(n_monomer, n_basis),
            c_fields: field::allocate(n_monomer, n_basis),
            stress: vec![0.0; n_parameter],
            propagator,
        })
    }

    pub fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    pub fn interaction(&self) -> &ChiInteraction {
        &self.interaction
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    pub fn w_fields(&self) -> &FieldSet {
        &self.w_fields
    }

    pub fn c_fields(&self) -> &FieldSet {
        &self.c_fields
    }

    /// Replaces the chemical potential fields, e.g. with an initial guess.
    pub fn set_w_fields(&mut self, fields: &[Field]) -> Result<()> {
        field::assign(&mut self.w_fields, fields)
    }

    /// Helmholtz free energy and pressure of the current solution.
    ///
    /// Basis functions are taken to be orthonormal with the spatial average
    /// at index 0, so spatial averages of products reduce to dot products of
    /// coefficient arrays.
    pub fn compute_free_energy(&self) -> Thermo {
        let mut ideal = 0.0;
        let mut mu_phi = 0.0;
        for polymer in &self.mixture.polymers {
            let length = polymer.length();
            if polymer.phi > 0.0 && length > 0.0 {
                ideal += polymer.phi * (polymer.mu - 1.0) / length;
                mu_phi += polymer.mu * polymer.phi / length;
            }
        }
        for solvent in &self.mixture.solvents {
            if solvent.phi > 0.0 && solvent.size > 0.0 {
                ideal += solvent.phi * (solvent.mu - 1.0) / solvent.size;
                mu_phi += solvent.mu * solvent.phi / solvent.size;
            }
        }

        let n_monomer = self.mixture.n_monomer();
        let mut field_term = 0.0;
        let mut excess = 0.0;
        for i in 0..n_monomer {
            field_term += dot(&self.w_fields[i], &self.c_fields[i]);
            for j in 0..n_monomer {
                excess += 0.5
                    * self.interaction.chi(i, j)
                    * dot(&self.c_fields[i], &self.c_fields[j]);
            }
        }

        let f_helmholtz = ideal - field_term + excess;
        Thermo {
            f_helmholtz,
            pressure: mu_phi - f_helmholtz,
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl<P: Propagator> ScfSystem for System<P> {
    fn n_monomer(&self) -> usize {
        self.mixture.n_monomer()
    }

    fn n_basis(&self) -> usize {
        self.n_basis
    }

    fn interaction(&self) -> &ChiInteraction {
        &self.interaction
    }

    fn is_canonical(&self) -> bool {
        self.mixture.is_canonical()
    }

    fn w_fields(&self) -> &[Field] {
        &self.w_fields
    }

    fn w_fields_mut(&mut self) -> &mut [Field] {
        &mut self.w_fields
    }

    fn c_fields(&self) -> &[Field] {
        &self.c_fields
    }

    fn compute(&mut self) -> Result<()> {
        let ctx = SolveContext {
            mixture: &mut self.mixture,
            interaction: &self.interaction,
            unit_cell: &self.unit_cell,
        };
        self.propagator
            .solve(ctx, &self.w_fields, &mut self.c_fields)?;
        Ok(())
    }

    fn compute_stress(&mut self) -> Result<()> {
        self.propagator
            .compute_stress(&self.mixture, &self.unit_cell, &mut self.stress)?;
        Ok(())
    }

    fn stress(&self) -> &[f64] {
        &self.stress
    }

    fn unit_cell_parameters(&self) -> &[f64] {
        self.unit_cell.parameters()
    }

    fn set_unit_cell_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        self.unit_cell.set_parameters(parameters)
    }
}

impl<P: Propagator> ParameterHost for System<P> {
    fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    fn mixture_mut(&mut self) -> &mut Mixture {
        &mut self.mixture
    }

    fn interaction(&self) -> &ChiInteraction {
        &self.interaction
    }

    fn interaction_mut(&mut self) -> &mut ChiInteraction {
        &mut self.interaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{diblock_system, LinearResponse};
    use approx::assert_relative_eq;

    #[test]
    fn compute_runs_the_propagator_on_current_fields() {
        let mut system = diblock_system(10.0, 3, LinearResponse::new(vec![0.2, -0.1]));
        system.compute().unwrap();
        assert_eq!(system.c_fields()[0][0], 0.5);
        assert_eq!(system.c_fields()[1][0], 0.5);
        assert_eq!(system.propagator().solves(), 1);
    }

    #[test]
    fn new_rejects_mismatched_interaction() {
        let system = diblock_system(10.0, 3, LinearResponse::new(vec![0.0]));
        let interaction = ChiInteraction::from_rows(&[vec![1.0]]).unwrap();
        let err = System::new(
            system.mixture().clone(),
            interaction,
            system.unit_cell().clone(),
            3,
            LinearResponse::new(vec![0.0]),
        )
        .err()
        .expect("chi size differs from monomer count");
        assert!(matches!(err, ScftError::ShapeMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn homogeneous_free_energy_matches_flory_huggins() {
        // Uniform fields w_i = chi c_j at phi = 1/2: the field and excess
        // terms reduce to -chi/4 per monomer.
        let mut system = diblock_system(10.0, 1, LinearResponse::new(vec![]));
        system.set_w_fields(&[vec![5.0], vec![5.0]]).unwrap();
        system.compute().unwrap();
        let thermo = system.compute_free_energy();
        let polymer = &system.mixture().polymers[0];
        let ideal = polymer.phi * (polymer.mu - 1.0) / polymer.length();
        assert_relative_eq!(thermo.f_helmholtz, ideal - 5.0 + 2.5, epsilon = 1e-12);
        assert_relative_eq!(
            thermo.pressure,
            polymer.mu * polymer.phi / polymer.length() - thermo.f_helmholtz,
            epsilon = 1e-12
        );
    }
}
